//! One-way mirror engine.
//!
//! Snapshots the source and replica trees, plans copy/delete actions, and
//! applies them on a worker pool with one sync-log record per mutation.

pub mod cancel;
pub mod engine;
pub mod exclude;
pub mod scan;

pub use cancel::CancelToken;
pub use engine::{PassStats, SyncAction, SyncConfig, SyncEngine};
pub use exclude::ExcludePatterns;
pub use scan::{scan_tree, FileEntry};
