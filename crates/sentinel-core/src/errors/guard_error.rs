//! Guard errors.

use super::error_code::{self, SentinelErrorCode};

/// Errors raised by a single guard during a check.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Guard {guard} failed: {message}")]
    Failed { guard: String, message: String },

    #[error("Guard {guard} panicked: {message}")]
    Panicked { guard: String, message: String },
}

impl SentinelErrorCode for GuardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Failed { .. } => error_code::GUARD_FAILED,
            Self::Panicked { .. } => error_code::GUARD_PANICKED,
        }
    }
}
