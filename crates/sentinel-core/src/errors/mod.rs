//! Error handling for Sentinel.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod channel_error;
pub mod config_error;
pub mod engine_error;
pub mod error_code;
pub mod fix_error;
pub mod guard_error;
pub mod parse_error;
pub mod watch_error;

pub use channel_error::ChannelError;
pub use config_error::ConfigError;
pub use engine_error::EngineError;
pub use error_code::SentinelErrorCode;
pub use fix_error::FixError;
pub use guard_error::GuardError;
pub use parse_error::ParseError;
pub use watch_error::WatchError;
