//! Event payloads emitted by the analysis pipeline and the fix path.

use std::path::PathBuf;

use crate::types::{GuardStats, Violation};

#[derive(Debug, Clone)]
pub struct AnalysisStartedEvent {
    pub file: PathBuf,
}

/// The complete, replacing violation set for one file.
#[derive(Debug, Clone)]
pub struct ViolationBatchEvent {
    pub file: PathBuf,
    pub violations: Vec<Violation>,
    pub duration_ms: u64,
}

/// A file's violations were evicted (deleted file, or a pass discarded
/// because the file vanished while it ran).
#[derive(Debug, Clone)]
pub struct FileClearedEvent {
    pub file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AnalysisErrorEvent {
    pub file: PathBuf,
    /// Set when a single guard failed; `None` for parse failures.
    pub guard: Option<String>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct FixAppliedEvent {
    pub violation_id: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ViolationDismissedEvent {
    pub violation_id: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StatsEvent {
    pub stats: GuardStats,
}
