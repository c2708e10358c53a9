//! Configuration constants, defaults and the discovery ignore set.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Config file location relative to the repository root.
pub const CONFIG_FILE: &str = ".github/awc.yaml";

pub fn default_workflows_dir() -> String {
    ".github/workflows".to_string()
}

pub fn default_max_parallel() -> usize {
    4
}

/// Compiled `ignore` patterns.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    set: GlobSet,
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    /// Whether `path` (relative to the workflows directory) is ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self {
            set: GlobSet::empty(),
        }
    }
}
