//! Watch scheduler errors.

use std::path::PathBuf;

use super::error_code::{self, SentinelErrorCode};

/// Errors that can occur while starting or running the watch scheduler.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Invalid glob pattern {pattern}: {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Failed to watch {path}: {message}")]
    Watcher { path: PathBuf, message: String },

    #[error("Watch root does not exist: {path}")]
    MissingRoot { path: PathBuf },

    #[error("Scheduler must be started inside a tokio runtime")]
    NoRuntime,
}

impl SentinelErrorCode for WatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidGlob { .. } => error_code::CONFIG_ERROR,
            _ => error_code::WATCH_ERROR,
        }
    }
}
