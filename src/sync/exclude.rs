//! Exclude pattern matching for mirror passes.
//!
//! Glob patterns keep matching relative paths out of both tree snapshots,
//! so an excluded file is neither copied nor deleted.

use std::path::Path;

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled set of exclude globs.
#[derive(Debug, Clone)]
pub struct ExcludePatterns {
    /// Compiled glob set for matching.
    glob_set: GlobSet,
    /// Raw pattern strings (for display).
    patterns: Vec<String>,
}

impl Default for ExcludePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcludePatterns {
    /// Create an empty exclude set: everything is mirrored.
    pub fn new() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Create from a list of glob patterns.
    pub fn from_patterns(patterns: &[&str]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_list = Vec::new();

        for pattern in patterns {
            let glob = Glob::new(pattern)?;
            builder.add(glob);
            pattern_list.push(pattern.to_string());
        }

        Ok(Self {
            glob_set: builder.build()?,
            patterns: pattern_list,
        })
    }

    /// Add a pattern to the exclude set.
    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        // Rebuild the glob set with the new pattern
        let mut builder = GlobSetBuilder::new();

        for existing in &self.patterns {
            if let Ok(glob) = Glob::new(existing) {
                builder.add(glob);
            }
        }

        let glob = Glob::new(pattern)?;
        builder.add(glob);
        self.patterns.push(pattern.to_string());

        self.glob_set = builder.build()?;
        Ok(())
    }

    /// Check if a relative path should be excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        if self.glob_set.is_match(path) {
            return true;
        }

        // Also check just the filename for patterns like "*.tmp"
        if let Some(filename) = path.file_name() {
            if self.glob_set.is_match(filename.to_string_lossy().as_ref()) {
                return true;
            }
        }

        // Check each path component for directory patterns
        for component in path.components() {
            if let std::path::Component::Normal(name) = component {
                if self.glob_set.is_match(name.to_string_lossy().as_ref()) {
                    return true;
                }
            }
        }

        false
    }

    /// Get the list of patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
