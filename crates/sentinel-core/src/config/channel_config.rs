//! Live channel configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the live channel. The listening port lives at the top
/// level (`channel_port`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChannelConfig {
    /// Interface to bind. Default: "127.0.0.1".
    pub host: Option<String>,
    /// Seconds between periodic stats broadcasts. Default: 30.
    pub stats_interval_secs: Option<u64>,
    /// Send the current violation set to a console right after it connects.
    /// Default: true.
    pub sync_on_connect: Option<bool>,
}

impl ChannelConfig {
    pub fn effective_host(&self) -> String {
        self.host.clone().unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn effective_stats_interval_secs(&self) -> u64 {
        self.stats_interval_secs.unwrap_or(30)
    }

    pub fn effective_sync_on_connect(&self) -> bool {
        self.sync_on_connect.unwrap_or(true)
    }
}
