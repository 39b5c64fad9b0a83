//! Include/exclude glob sets, matched relative to the watch root.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use sentinel_core::errors::WatchError;
use sentinel_core::SentinelConfig;

#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

fn build_set(patterns: &[String]) -> Result<GlobSet, WatchError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| WatchError::InvalidGlob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| WatchError::InvalidGlob {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

impl PathFilter {
    pub fn new(root: &Path, include: &[String], exclude: &[String]) -> Result<Self, WatchError> {
        Ok(Self {
            root: root.to_path_buf(),
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    pub fn from_config(root: &Path, config: &SentinelConfig) -> Result<Self, WatchError> {
        Self::new(
            root,
            &config.effective_watch_paths(),
            &config.effective_ignore_paths(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Included and not excluded. Paths outside the root never match.
    pub fn matches(&self, path: &Path) -> bool {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => return false,
            }
        } else {
            path.strip_prefix(&self.root).unwrap_or(path)
        };
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}
