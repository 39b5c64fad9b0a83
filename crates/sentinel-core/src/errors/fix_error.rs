//! Quick-fix errors.

use std::path::PathBuf;

use super::error_code::{self, SentinelErrorCode};
use super::{GuardError, ParseError};

/// Errors that can occur while resolving or applying a quick-fix.
#[derive(Debug, thiserror::Error)]
pub enum FixError {
    #[error("Unknown violation: {violation_id}")]
    UnknownViolation { violation_id: String },

    #[error("Violation {violation_id} has no quick-fix")]
    NoQuickFix { violation_id: String },

    #[error("Guard {guard} is not registered")]
    UnknownGuard { guard: String },

    #[error("Violation {fingerprint} is no longer present in {path}")]
    Stale { path: PathBuf, fingerprint: String },

    #[error("Could not re-parse {path} before applying fix: {source}")]
    Reparse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Guard failed while re-checking {path}: {source}")]
    Guard {
        path: PathBuf,
        #[source]
        source: GuardError,
    },

    #[error("Fix for {path} would produce unparseable source: {source}")]
    BrokenResult {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Invalid edit {start}..{end} for a {len}-byte file: {reason}")]
    InvalidEdit {
        start: usize,
        end: usize,
        len: usize,
        reason: &'static str,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SentinelErrorCode for FixError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownViolation { .. } => error_code::FIX_UNKNOWN_VIOLATION,
            Self::NoQuickFix { .. } | Self::UnknownGuard { .. } => error_code::FIX_UNAVAILABLE,
            Self::Stale { .. } => error_code::FIX_STALE,
            Self::Reparse { source, .. } => source.error_code(),
            Self::Guard { source, .. } => source.error_code(),
            Self::BrokenResult { .. } => error_code::FIX_INVALID_EDIT,
            Self::InvalidEdit { .. } => error_code::FIX_INVALID_EDIT,
            Self::Write { .. } => error_code::FIX_WRITE_FAILED,
        }
    }
}
