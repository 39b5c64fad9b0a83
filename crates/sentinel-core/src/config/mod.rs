//! Configuration system for Sentinel.
//! TOML-based, 4-layer resolution: CLI > env > project > user > defaults.

pub mod channel_config;
pub mod rate_limit_config;
pub mod sentinel_config;
pub mod tenant_config;

pub use channel_config::ChannelConfig;
pub use rate_limit_config::RateLimitConfig;
pub use sentinel_config::{CliOverrides, ConfigUpdate, SentinelConfig};
pub use tenant_config::TenantConfig;

/// Guard names, in registration order.
pub const GUARD_TENANT_ISOLATION: &str = "tenant-isolation";
pub const GUARD_RATE_LIMIT: &str = "rate-limit";
pub const GUARD_N_PLUS_ONE: &str = "n-plus-one";
pub const GUARD_ERROR_HANDLING: &str = "error-handling";

pub const ALL_GUARDS: &[&str] = &[
    GUARD_TENANT_ISOLATION,
    GUARD_RATE_LIMIT,
    GUARD_N_PLUS_ONE,
    GUARD_ERROR_HANDLING,
];
