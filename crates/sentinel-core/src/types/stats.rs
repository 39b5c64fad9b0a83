//! Process-wide run statistics.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardStats {
    pub total_files: u64,
    pub processed_files: u64,
    pub violations: u64,
    pub errors: u64,
    pub last_run: Option<DateTime<Utc>>,
}

/// Monotonic counters shared by every analysis pass. Only ever incremented.
#[derive(Debug, Default)]
pub struct StatsCounters {
    total_files: AtomicU64,
    processed_files: AtomicU64,
    violations: AtomicU64,
    errors: AtomicU64,
    /// Unix millis of the last completed pass, 0 when none.
    last_run_ms: AtomicI64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pass was started for one file.
    pub fn record_started(&self) {
        self.total_files.fetch_add(1, Ordering::Relaxed);
    }

    /// A pass completed and produced `violations` findings.
    pub fn record_completed(&self, violations: usize) {
        self.processed_files.fetch_add(1, Ordering::Relaxed);
        self.violations
            .fetch_add(violations as u64, Ordering::Relaxed);
        self.last_run_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GuardStats {
        let last_ms = self.last_run_ms.load(Ordering::Relaxed);
        GuardStats {
            total_files: self.total_files.load(Ordering::Relaxed),
            processed_files: self.processed_files.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_run: if last_ms == 0 {
                None
            } else {
                Utc.timestamp_millis_opt(last_ms).single()
            },
        }
    }
}
