//! SentinelErrorCode trait for structured error codes on the wire.

/// Every error enum implements this to expose a stable code string that
/// consoles can match on (e.g. inside a `fix-error` payload).
pub trait SentinelErrorCode {
    /// Returns the error code string (e.g., "PARSE_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted wire string: `[ERROR_CODE] message`.
    fn wire_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const UNSUPPORTED_LANGUAGE: &str = "UNSUPPORTED_LANGUAGE";
pub const IO_ERROR: &str = "IO_ERROR";
pub const GUARD_FAILED: &str = "GUARD_FAILED";
pub const GUARD_PANICKED: &str = "GUARD_PANICKED";
pub const FIX_UNKNOWN_VIOLATION: &str = "FIX_UNKNOWN_VIOLATION";
pub const FIX_UNAVAILABLE: &str = "FIX_UNAVAILABLE";
pub const FIX_STALE: &str = "FIX_STALE";
pub const FIX_INVALID_EDIT: &str = "FIX_INVALID_EDIT";
pub const FIX_WRITE_FAILED: &str = "FIX_WRITE_FAILED";
pub const WATCH_ERROR: &str = "WATCH_ERROR";
pub const CHANNEL_ERROR: &str = "CHANNEL_ERROR";
pub const PROTOCOL_ERROR: &str = "PROTOCOL_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
