//! Structured field names shared by spans and events across Sentinel.
//!
//! Consistent names keep log queries stable across crates.

/// Path of the file being analyzed.
pub const FILE: &str = "file";

/// Guard name.
pub const GUARD: &str = "guard";

/// Parse time for one file, in microseconds.
pub const PARSE_TIME_US: &str = "parse_time_us";

/// Whole pass (parse + guards) duration, in milliseconds.
pub const PASS_DURATION_MS: &str = "pass_duration_ms";

/// Number of violations in a batch.
pub const VIOLATION_COUNT: &str = "violation_count";

/// Live channel connection id.
pub const CONNECTION_ID: &str = "connection_id";
