//! Mirror pass engine.
//!
//! Plans the file-level diff between the source and replica trees, then
//! applies copy and delete operations on a worker pool. Each successful
//! mutation emits exactly one sync-log record, after the operation lands.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use filetime::FileTime;
use rayon::prelude::*;

use super::exclude::ExcludePatterns;
use super::scan::{absolute_path, scan_tree, FileEntry};
use crate::logger::LogSink;

/// Planned mutation for one relative path. Lives only for the pass that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy the source file over the replica path, creating intermediate
    /// directories as needed.
    Copy { relative: PathBuf },
    /// Remove the replica file that no longer exists in source.
    Delete { relative: PathBuf },
}

impl SyncAction {
    /// Get the relative path this action targets.
    pub fn relative(&self) -> &Path {
        match self {
            Self::Copy { relative } => relative,
            Self::Delete { relative } => relative,
        }
    }
}

/// Pass configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Exclude patterns applied to both tree snapshots.
    pub exclude: ExcludePatterns,
    /// Plan and report without touching the filesystem or the sync log.
    pub dry_run: bool,
    /// Worker threads for file operations.
    pub workers: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            exclude: ExcludePatterns::new(),
            dry_run: false,
            workers: num_cpus::get(),
        }
    }
}

/// Counters for one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Files present in the source snapshot.
    pub files_scanned: usize,
    /// Files copied or updated.
    pub files_copied: usize,
    /// Replica files deleted.
    pub files_deleted: usize,
    /// Files already in sync.
    pub files_skipped: usize,
    /// Operations that failed and will be retried next pass.
    pub files_failed: usize,
    /// Pass duration.
    pub duration_ms: u64,
}

impl PassStats {
    /// True when the pass performed no mutation and hit no failure.
    pub fn is_noop(&self) -> bool {
        self.files_copied == 0 && self.files_deleted == 0 && self.files_failed == 0
    }
}

/// Engine for one-way mirror passes over a fixed source/replica pair.
pub struct SyncEngine {
    source_root: PathBuf,
    replica_root: PathBuf,
    config: SyncConfig,
    pool: rayon::ThreadPool,
    sink: LogSink,
}

impl SyncEngine {
    pub fn new(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        sink: LogSink,
    ) -> Result<Self> {
        Self::with_config(source_root, replica_root, sink, SyncConfig::default())
    }

    pub fn with_config(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        sink: LogSink,
        config: SyncConfig,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .build()
            .context("Failed to build worker pool")?;

        Ok(Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            config,
            pool,
            sink,
        })
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn replica_root(&self) -> &Path {
        &self.replica_root
    }

    /// Run one mirror pass: snapshot both trees, plan the diff, apply it in
    /// parallel, and drain the sync log before returning.
    ///
    /// Only enumeration failures abort the pass. Per-file copy and delete
    /// failures are reported, counted, and retried naturally on the next
    /// pass because the staleness condition persists.
    pub fn run_pass(&self) -> Result<PassStats> {
        let started = Instant::now();
        let mut stats = PassStats::default();

        // The sync log must not take part in the mirror when it lives under
        // one of the roots.
        let log_path = absolute_path(self.sink.path());

        let source = scan_tree(&self.source_root, &self.config.exclude, Some(&log_path))
            .with_context(|| {
                format!("Failed to scan source tree {}", self.source_root.display())
            })?;
        // A replica root that does not exist yet is an empty tree; it is
        // created on demand by the first copy.
        let replica = if self.replica_root.exists() {
            scan_tree(&self.replica_root, &self.config.exclude, Some(&log_path)).with_context(
                || format!("Failed to scan replica tree {}", self.replica_root.display()),
            )?
        } else {
            HashMap::new()
        };

        stats.files_scanned = source.len();
        let actions = plan_actions(&source, &replica, &mut stats);

        if self.config.dry_run {
            for action in &actions {
                match action {
                    SyncAction::Copy { relative } => {
                        println!("Would copy/update: {}", relative.display())
                    }
                    SyncAction::Delete { relative } => {
                        println!("Would remove: {}", relative.display())
                    }
                }
            }
            stats.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(stats);
        }

        let copied = AtomicUsize::new(0);
        let deleted = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        // One task per action. Distinct relative paths mean distinct
        // destinations, so tasks share nothing but the log sink.
        self.pool.install(|| {
            actions.par_iter().for_each(|action| match self.apply(action) {
                Ok(()) => match action {
                    SyncAction::Copy { .. } => {
                        copied.fetch_add(1, Ordering::Relaxed);
                    }
                    SyncAction::Delete { .. } => {
                        deleted.fetch_add(1, Ordering::Relaxed);
                    }
                },
                Err(err) => {
                    eprintln!("Warning: {:#}", err);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            });
        });

        // The pass is complete only once the log reflects it.
        self.sink.flush();

        stats.files_copied = copied.into_inner();
        stats.files_deleted = deleted.into_inner();
        stats.files_failed = failed.into_inner();
        stats.duration_ms = started.elapsed().as_millis() as u64;
        Ok(stats)
    }

    fn apply(&self, action: &SyncAction) -> Result<()> {
        match action {
            SyncAction::Copy { relative } => {
                let source = self.source_root.join(relative);
                let dest = self.replica_root.join(relative);
                copy_into_place(&source, &dest)
                    .with_context(|| format!("Failed to copy {}", relative.display()))?;
                self.sink
                    .record(format!("Copied/Updated: {}", relative.display()));
            }
            SyncAction::Delete { relative } => {
                let dest = self.replica_root.join(relative);
                fs::remove_file(&dest)
                    .with_context(|| format!("Failed to remove {}", relative.display()))?;
                self.sink.record(format!("Removed: {}", relative.display()));
            }
        }
        Ok(())
    }
}

/// Compute the pass diff. Forward: source files absent from the replica or
/// strictly newer than their replica counterpart are copied; equal
/// timestamps are already in sync. Reverse: replica files absent from
/// source are deleted.
fn plan_actions(
    source: &HashMap<PathBuf, FileEntry>,
    replica: &HashMap<PathBuf, FileEntry>,
    stats: &mut PassStats,
) -> Vec<SyncAction> {
    let mut actions = Vec::new();

    for (relative, entry) in source {
        match replica.get(relative) {
            Some(existing) if entry.modified <= existing.modified => {
                stats.files_skipped += 1;
            }
            _ => actions.push(SyncAction::Copy {
                relative: relative.clone(),
            }),
        }
    }

    for relative in replica.keys() {
        if !source.contains_key(relative) {
            actions.push(SyncAction::Delete {
                relative: relative.clone(),
            });
        }
    }

    actions
}

/// Copy through a temporary name in the destination directory and rename
/// into place, so a stop or crash mid-copy never leaves a half-written file
/// at the final path. The source mtime is carried onto the copy so an
/// unchanged file compares equal on the next pass.
fn copy_into_place(source: &Path, dest: &Path) -> Result<()> {
    let parent = dest
        .parent()
        .with_context(|| format!("Destination {} has no parent", dest.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let mut tmp_name = OsString::from(".");
    tmp_name.push(
        dest.file_name()
            .with_context(|| format!("Destination {} has no file name", dest.display()))?,
    );
    tmp_name.push(".partial");
    let tmp = parent.join(tmp_name);

    let staged = stage_copy(source, &tmp, dest);
    if staged.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    staged
}

fn stage_copy(source: &Path, tmp: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, tmp)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), tmp.display()))?;

    let metadata = fs::metadata(source)
        .with_context(|| format!("Failed to read metadata of {}", source.display()))?;
    filetime::set_file_mtime(tmp, FileTime::from_last_modification_time(&metadata))
        .with_context(|| format!("Failed to set modification time on {}", tmp.display()))?;

    fs::rename(tmp, dest)
        .with_context(|| format!("Failed to move copy into place at {}", dest.display()))?;
    Ok(())
}
