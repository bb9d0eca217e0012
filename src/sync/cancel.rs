// Cooperative cancellation for the pass loop
// The driver observes the token between passes and while sleeping

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Cloneable cancellation flag. Cancelling any clone is visible to all.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on cancellation. Returns true if
    /// the token was cancelled before the wait finished.
    pub fn wait(&self, duration: Duration) -> bool {
        let slice = Duration::from_millis(100);
        let mut remaining = duration;

        while !remaining.is_zero() {
            if self.is_cancelled() {
                return true;
            }
            let step = remaining.min(slice);
            thread::sleep(step);
            remaining -= step;
        }

        self.is_cancelled()
    }
}
