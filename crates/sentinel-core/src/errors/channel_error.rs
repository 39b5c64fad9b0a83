//! Live channel errors.

use super::error_code::{self, SentinelErrorCode};

/// Errors at the live channel boundary.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to bind channel on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Malformed message: {message}")]
    Malformed { message: String },

    #[error("Unknown message type: {kind}")]
    UnknownType { kind: String },

    #[error("Message type {kind} is not accepted from clients")]
    NotAccepted { kind: String },
}

impl SentinelErrorCode for ChannelError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Bind { .. } => error_code::CHANNEL_ERROR,
            _ => error_code::PROTOCOL_ERROR,
        }
    }
}
