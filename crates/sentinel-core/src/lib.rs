//! sentinel-core: shared foundation for the Sentinel live policy engine.
//!
//! - `types`: violations, quick-fix descriptors, run statistics
//! - `errors`: one `thiserror` enum per subsystem plus stable error codes
//! - `config`: layered TOML configuration with runtime updates
//! - `events`: handler trait and dispatcher used to fan out analysis results
//! - `tracing`: subscriber setup and structured field names

pub mod config;
pub mod errors;
pub mod events;
pub mod tracing;
pub mod types;

pub use config::SentinelConfig;
pub use types::{Category, FixDescriptor, GuardStats, Severity, StatsCounters, TextEdit, Violation};
