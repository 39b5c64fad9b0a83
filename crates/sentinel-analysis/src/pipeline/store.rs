//! Per-file violation map. A file's set is always replaced wholesale.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use sentinel_core::Violation;

#[derive(Debug, Default)]
pub struct ViolationStore {
    files: DashMap<PathBuf, Vec<Violation>>,
}

impl ViolationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set for `path`. An empty set removes the entry.
    pub fn replace(&self, path: &Path, violations: Vec<Violation>) {
        if violations.is_empty() {
            self.files.remove(path);
        } else {
            self.files.insert(path.to_path_buf(), violations);
        }
    }

    pub fn remove(&self, path: &Path) -> Option<Vec<Violation>> {
        self.files.remove(path).map(|(_, v)| v)
    }

    pub fn get(&self, path: &Path) -> Vec<Violation> {
        self.files
            .get(path)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    pub fn find(&self, id: &str) -> Option<Violation> {
        self.files
            .iter()
            .find_map(|entry| entry.value().iter().find(|v| v.id == id).cloned())
    }

    /// Remove a single violation by id.
    pub fn remove_violation(&self, id: &str) -> Option<Violation> {
        let path = self
            .files
            .iter()
            .find(|entry| entry.value().iter().any(|v| v.id == id))
            .map(|entry| entry.key().clone())?;

        let removed = {
            let mut entry = self.files.get_mut(&path)?;
            let index = entry.iter().position(|v| v.id == id)?;
            entry.remove(index)
        };
        self.files.remove_if(&path, |_, v| v.is_empty());
        Some(removed)
    }

    /// Files currently holding violations, sorted by path.
    pub fn snapshot(&self) -> Vec<(PathBuf, Vec<Violation>)> {
        let mut files: Vec<_> = self
            .files
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn violation_count(&self) -> usize {
        self.files.iter().map(|e| e.value().len()).sum()
    }
}
