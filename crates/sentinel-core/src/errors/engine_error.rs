//! Engine-level errors: whatever stops the engine from starting, from
//! accepting a config update, or from completing an on-demand operation.

use super::error_code::{self, SentinelErrorCode};
use super::{ChannelError, ConfigError, FixError, ParseError, WatchError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Fix(#[from] FixError),

    #[error("Unknown guard: {name}")]
    UnknownGuard { name: String },
}

impl SentinelErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Watch(e) => e.error_code(),
            Self::Channel(e) => e.error_code(),
            Self::Parse(e) => e.error_code(),
            Self::Fix(e) => e.error_code(),
            Self::UnknownGuard { .. } => error_code::CONFIG_ERROR,
        }
    }
}
