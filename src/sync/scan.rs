// Tree snapshot module
// Enumerates every file under a root and keys it by path relative to that root

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jwalk::WalkDir;

use super::exclude::ExcludePatterns;

/// A regular file observed during one pass.
///
/// The relative path is the file's identity across the two trees; the
/// snapshot it belongs to is discarded when the pass ends.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the tree root.
    pub relative: PathBuf,
    /// Path as reachable from the walked root.
    pub absolute: PathBuf,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

/// Recursively enumerate the files under `root`.
///
/// Directories are not modeled; they are implicit in the relative paths.
/// `skip` names one path left out of the snapshot — the engine uses it to
/// keep the sync log from being mirrored or deleted when it lives under one
/// of the roots. Files that vanish between discovery and stat are skipped
/// with a warning; they are picked up again on the next pass.
pub fn scan_tree(
    root: &Path,
    exclude: &ExcludePatterns,
    skip: Option<&Path>,
) -> Result<HashMap<PathBuf, FileEntry>> {
    let mut entries = HashMap::new();

    // Walk on a separate rayon pool so traversal never contends with the
    // engine's worker pool. Hidden files are part of the mirror; symlinks
    // are not followed to avoid loops.
    for result in WalkDir::new(root)
        .parallelism(jwalk::Parallelism::RayonNewPool(0))
        .skip_hidden(false)
        .follow_links(false)
    {
        let entry = result.with_context(|| format!("Failed to enumerate {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let absolute = entry.path();
        if skip.is_some_and(|s| s == absolute_path(&absolute)) {
            continue;
        }

        let relative = absolute
            .strip_prefix(root)
            .with_context(|| {
                format!(
                    "Path {} escapes root {}",
                    absolute.display(),
                    root.display()
                )
            })?
            .to_path_buf();
        if exclude.is_excluded(&relative) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                eprintln!("Warning: Failed to stat {}: {}", absolute.display(), err);
                continue;
            }
        };
        let modified: DateTime<Utc> = match metadata.modified() {
            Ok(modified) => modified.into(),
            Err(err) => {
                eprintln!(
                    "Warning: No modification time for {}: {}",
                    absolute.display(),
                    err
                );
                continue;
            }
        };

        entries.insert(
            relative.clone(),
            FileEntry {
                relative,
                absolute,
                modified,
            },
        );
    }

    Ok(entries)
}

/// Resolve a path against the current directory without touching the
/// filesystem, so paths can be compared before the files exist.
pub(crate) fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
