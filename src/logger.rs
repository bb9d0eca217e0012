// Sync log sink
// Serializes timestamped action records to the console and an append-only log file

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};

enum Command {
    Record(String),
    Flush(Sender<()>),
}

/// Handle to the single-writer log actor.
///
/// `record` never fails from the caller's perspective: a dedicated writer
/// thread owns the log file and the console stream, and downgrades its own
/// I/O failures to console warnings. Handles are cheap to clone and share
/// across worker threads; records from a single handle are written in the
/// order they were submitted.
#[derive(Clone)]
pub struct LogSink {
    tx: Sender<Command>,
    path: PathBuf,
}

impl LogSink {
    /// Create a sink backed by the given log file. The file itself is
    /// created lazily on the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = unbounded::<Command>();

        let writer_path = path.clone();
        thread::spawn(move || {
            // Exits when every handle has been dropped.
            for command in rx {
                match command {
                    Command::Record(message) => {
                        let line = format!(
                            "{} - {}",
                            Local::now().format("%Y-%m-%d %H:%M:%S"),
                            message
                        );
                        println!("{}", line);
                        if let Err(err) = append_line(&writer_path, &line) {
                            report_write_failure(&writer_path, &err);
                        }
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Self { tx, path }
    }

    /// Queue an action record. A closed actor means the process is already
    /// shutting down, so delivery failures are ignored.
    pub fn record(&self, message: impl Into<String>) {
        let _ = self.tx.send(Command::Record(message.into()));
    }

    /// Block until every record queued before this call has been written.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Path of the backing log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Creating the file when missing and appending are a single open call, so
// the first append cannot race store creation.
fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

fn report_write_failure(path: &Path, err: &io::Error) {
    if err.kind() == io::ErrorKind::PermissionDenied {
        eprintln!(
            "Warning: Access denied writing to log file {}. Check write permissions.",
            path.display()
        );
    } else {
        eprintln!("Warning: Failed to write to log file {}: {}", path.display(), err);
    }
}
