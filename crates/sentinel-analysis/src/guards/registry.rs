//! Ordered guard registry with per-guard runtime switches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sentinel_core::SentinelConfig;

use super::traits::Guard;
use super::{ErrorHandlingGuard, NPlusOneGuard, RateLimitGuard, TenantIsolationGuard};

struct Registered {
    guard: Arc<dyn Guard>,
    enabled: AtomicBool,
}

/// Guards in registration order. The set is fixed once the engine is
/// assembled; only the enabled flags change afterwards.
#[derive(Default)]
pub struct GuardRegistry {
    entries: Vec<Registered>,
}

impl GuardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in guards, configured and switched from `config`.
    pub fn from_config(config: &SentinelConfig) -> Self {
        let mut registry = Self::new();
        let guards: [Arc<dyn Guard>; 4] = [
            Arc::new(TenantIsolationGuard::new(&config.tenant)),
            Arc::new(RateLimitGuard::new(&config.rate_limit)),
            Arc::new(NPlusOneGuard::new()),
            Arc::new(ErrorHandlingGuard::new()),
        ];
        for guard in guards {
            let enabled = config.is_guard_enabled(guard.name());
            registry.register(guard, enabled);
        }
        registry
    }

    /// Register a guard. Duplicate names are rejected.
    pub fn register(&mut self, guard: Arc<dyn Guard>, enabled: bool) -> bool {
        if self.entries.iter().any(|e| e.guard.name() == guard.name()) {
            tracing::warn!(guard = guard.name(), "duplicate guard registration ignored");
            return false;
        }
        self.entries.push(Registered {
            guard,
            enabled: AtomicBool::new(enabled),
        });
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Guard>> {
        self.entries
            .iter()
            .find(|e| e.guard.name() == name)
            .map(|e| Arc::clone(&e.guard))
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries
            .iter()
            .find(|e| e.guard.name() == name)
            .is_some_and(|e| e.enabled.load(Ordering::Relaxed))
    }

    /// Returns false when no guard has that name.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.entries.iter().find(|e| e.guard.name() == name) {
            Some(entry) => {
                entry.enabled.store(enabled, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Enabled guards in registration order.
    pub fn enabled(&self) -> Vec<Arc<dyn Guard>> {
        self.entries
            .iter()
            .filter(|e| e.enabled.load(Ordering::Relaxed))
            .map(|e| Arc::clone(&e.guard))
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.guard.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
