//! Rate-limiting guard configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Designated wrapper helper. Default: "withRateLimit".
    pub wrapper: Option<String>,
    /// Module the wrapper is imported from. Default: "@/lib/rate-limit".
    pub import_path: Option<String>,
}

impl RateLimitConfig {
    pub fn effective_wrapper(&self) -> String {
        self.wrapper
            .clone()
            .unwrap_or_else(|| "withRateLimit".to_string())
    }

    pub fn effective_import_path(&self) -> String {
        self.import_path
            .clone()
            .unwrap_or_else(|| "@/lib/rate-limit".to_string())
    }
}
