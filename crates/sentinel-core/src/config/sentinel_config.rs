//! Top-level Sentinel configuration with 4-layer resolution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{ChannelConfig, RateLimitConfig, TenantConfig};
use crate::errors::ConfigError;

/// Default include globs, relative to the watch root.
pub const DEFAULT_WATCH_PATHS: &[&str] = &[
    "app/**/*.{ts,tsx,js,jsx}",
    "src/**/*.{ts,tsx,js,jsx}",
    "lib/**/*.{ts,tsx,js,jsx}",
    "pages/**/*.{ts,tsx,js,jsx}",
    "components/**/*.{ts,tsx,js,jsx}",
];

/// Default exclude globs, relative to the watch root.
pub const DEFAULT_IGNORE_PATHS: &[&str] = &[
    "**/node_modules/**",
    "**/.next/**",
    "**/dist/**",
    "**/build/**",
    "**/coverage/**",
    "**/__tests__/**",
    "**/*.test.*",
    "**/*.spec.*",
    "**/*.d.ts",
];

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_CHANNEL_PORT: u16 = 3001;
const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Top-level configuration.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`SENTINEL_*`)
/// 3. Project config (`sentinel.toml` in the watch root)
/// 4. User config (`~/.sentinel/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SentinelConfig {
    /// Master switch. Default: true.
    pub enabled: Option<bool>,
    /// Include globs. Default: `DEFAULT_WATCH_PATHS`.
    pub watch_paths: Vec<String>,
    /// Exclude globs. Default: `DEFAULT_IGNORE_PATHS`.
    pub ignore_paths: Vec<String>,
    /// Debounce window per path. Default: 500.
    pub debounce_ms: Option<u64>,
    /// Live channel port. Default: 3001.
    pub channel_port: Option<u16>,
    /// Debug-level logging. Default: false.
    pub verbose: Option<bool>,
    /// Per-guard switches. Guards missing from the map are enabled.
    pub guards_enabled: BTreeMap<String, bool>,
    pub channel: ChannelConfig,
    pub tenant: TenantConfig,
    pub rate_limit: RateLimitConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub enabled: Option<bool>,
    pub debounce_ms: Option<u64>,
    pub channel_port: Option<u16>,
    pub verbose: Option<bool>,
}

/// Runtime patch applied through `SentinelConfig::apply_update`.
/// Only the switches that can change without a restart are exposed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub enabled: Option<bool>,
    pub debounce_ms: Option<u64>,
    pub guards_enabled: BTreeMap<String, bool>,
    pub verbose: Option<bool>,
}

impl SentinelConfig {
    /// Load configuration with 4-layer resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        // Layer 3: project config
        let project_config_path = root.join("sentinel.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn effective_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn effective_watch_paths(&self) -> Vec<String> {
        if self.watch_paths.is_empty() {
            DEFAULT_WATCH_PATHS.iter().map(|p| p.to_string()).collect()
        } else {
            self.watch_paths.clone()
        }
    }

    pub fn effective_ignore_paths(&self) -> Vec<String> {
        if self.ignore_paths.is_empty() {
            DEFAULT_IGNORE_PATHS.iter().map(|p| p.to_string()).collect()
        } else {
            self.ignore_paths.clone()
        }
    }

    pub fn effective_debounce_ms(&self) -> u64 {
        self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    pub fn effective_channel_port(&self) -> u16 {
        self.channel_port.unwrap_or(DEFAULT_CHANNEL_PORT)
    }

    pub fn effective_verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }

    pub fn is_guard_enabled(&self, name: &str) -> bool {
        self.guards_enabled.get(name).copied().unwrap_or(true)
    }

    /// Validate the configuration values.
    pub fn validate(config: &SentinelConfig) -> Result<(), ConfigError> {
        if let Some(ms) = config.debounce_ms {
            validate_debounce(ms)?;
        }
        for (field, patterns) in [
            ("watch_paths", config.effective_watch_paths()),
            ("ignore_paths", config.effective_ignore_paths()),
        ] {
            for pattern in &patterns {
                if let Err(e) = globset::Glob::new(pattern) {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: format!("invalid glob '{pattern}': {e}"),
                    });
                }
            }
        }
        if config.channel.stats_interval_secs == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "channel.stats_interval_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.tenant.field.as_deref() == Some("") {
            return Err(ConfigError::ValidationFailed {
                field: "tenant.field".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Apply a runtime patch. The config is left untouched when the patch
    /// does not validate.
    pub fn apply_update(&mut self, update: &ConfigUpdate) -> Result<(), ConfigError> {
        if let Some(ms) = update.debounce_ms {
            validate_debounce(ms)?;
        }
        if let Some(v) = update.enabled {
            self.enabled = Some(v);
        }
        if let Some(v) = update.debounce_ms {
            self.debounce_ms = Some(v);
        }
        if let Some(v) = update.verbose {
            self.verbose = Some(v);
        }
        for (name, on) in &update.guards_enabled {
            self.guards_enabled.insert(name.clone(), *on);
        }
        Ok(())
    }

    /// Returns the user config path: `~/.sentinel/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".sentinel").join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut SentinelConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: SentinelConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins wherever it sets a value.
    fn merge(base: &mut SentinelConfig, other: &SentinelConfig) {
        if other.enabled.is_some() {
            base.enabled = other.enabled;
        }
        if !other.watch_paths.is_empty() {
            base.watch_paths = other.watch_paths.clone();
        }
        if !other.ignore_paths.is_empty() {
            base.ignore_paths = other.ignore_paths.clone();
        }
        if other.debounce_ms.is_some() {
            base.debounce_ms = other.debounce_ms;
        }
        for (name, on) in &other.guards_enabled {
            base.guards_enabled.insert(name.clone(), *on);
        }
        if other.channel_port.is_some() {
            base.channel_port = other.channel_port;
        }
        if other.verbose.is_some() {
            base.verbose = other.verbose;
        }

        // Channel
        if other.channel.host.is_some() {
            base.channel.host = other.channel.host.clone();
        }
        if other.channel.stats_interval_secs.is_some() {
            base.channel.stats_interval_secs = other.channel.stats_interval_secs;
        }
        if other.channel.sync_on_connect.is_some() {
            base.channel.sync_on_connect = other.channel.sync_on_connect;
        }

        // Tenant
        if !other.tenant.resources.is_empty() {
            base.tenant.resources = other.tenant.resources.clone();
        }
        if other.tenant.field.is_some() {
            base.tenant.field = other.tenant.field.clone();
        }
        if other.tenant.variable.is_some() {
            base.tenant.variable = other.tenant.variable.clone();
        }
        if other.tenant.extraction.is_some() {
            base.tenant.extraction = other.tenant.extraction.clone();
        }

        // Rate limit
        if other.rate_limit.wrapper.is_some() {
            base.rate_limit.wrapper = other.rate_limit.wrapper.clone();
        }
        if other.rate_limit.import_path.is_some() {
            base.rate_limit.import_path = other.rate_limit.import_path.clone();
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(config: &mut SentinelConfig) {
        if let Ok(val) = std::env::var("SENTINEL_ENABLED") {
            if let Ok(v) = val.parse::<bool>() {
                config.enabled = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SENTINEL_DEBOUNCE_MS") {
            if let Ok(v) = val.parse::<u64>() {
                config.debounce_ms = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SENTINEL_CHANNEL_PORT") {
            if let Ok(v) = val.parse::<u16>() {
                config.channel_port = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SENTINEL_VERBOSE") {
            if let Ok(v) = val.parse::<bool>() {
                config.verbose = Some(v);
            }
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut SentinelConfig, cli: &CliOverrides) {
        if let Some(v) = cli.enabled {
            config.enabled = Some(v);
        }
        if let Some(v) = cli.debounce_ms {
            config.debounce_ms = Some(v);
        }
        if let Some(v) = cli.channel_port {
            config.channel_port = Some(v);
        }
        if let Some(v) = cli.verbose {
            config.verbose = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn validate_debounce(ms: u64) -> Result<(), ConfigError> {
    if ms == 0 || ms > MAX_DEBOUNCE_MS {
        return Err(ConfigError::ValidationFailed {
            field: "debounce_ms".to_string(),
            message: format!("must be between 1 and {MAX_DEBOUNCE_MS}"),
        });
    }
    Ok(())
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
