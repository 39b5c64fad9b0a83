//! Tree builder errors.

use std::path::PathBuf;

use super::error_code::{self, SentinelErrorCode};

/// Errors that can occur while building a syntax tree for one file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported file extension: {path}")]
    UnsupportedExtension { path: PathBuf },

    #[error("Grammar could not be loaded: {message}")]
    Grammar { message: String },

    #[error("Parser produced no tree for {path}")]
    NoTree { path: PathBuf },

    #[error("Syntax error in {path} at {line}:{column} ({count} error node(s))")]
    Syntax {
        path: PathBuf,
        line: u32,
        column: u32,
        count: u32,
    },
}

impl SentinelErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => error_code::IO_ERROR,
            Self::UnsupportedExtension { .. } => error_code::UNSUPPORTED_LANGUAGE,
            _ => error_code::PARSE_ERROR,
        }
    }
}
