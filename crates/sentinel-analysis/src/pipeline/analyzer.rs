//! Per-file analysis passes.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sentinel_core::errors::{FixError, GuardError, ParseError, SentinelErrorCode};
use sentinel_core::events::{
    AnalysisErrorEvent, AnalysisStartedEvent, EventDispatcher, FileClearedEvent, FixAppliedEvent,
    ViolationBatchEvent, ViolationDismissedEvent,
};
use sentinel_core::{GuardStats, StatsCounters, Violation};

use super::store::ViolationStore;
use crate::fixes::{self, FixOutcome};
use crate::guards::GuardRegistry;
use crate::scheduler::PathFilter;
use crate::tree::{Dialect, TreeBuilder};

/// Outcome of one completed pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: PathBuf,
    pub violations: Vec<Violation>,
    pub duration_ms: u64,
    pub guard_errors: usize,
}

/// Runs guard passes and owns everything a pass touches: the tree builder
/// (and its semantic index), the guard registry, the violation store and the
/// statistics counters.
pub struct Analyzer {
    builder: TreeBuilder,
    registry: GuardRegistry,
    store: ViolationStore,
    stats: StatsCounters,
    events: Arc<EventDispatcher>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Analyzer {
    pub fn new(registry: GuardRegistry, events: Arc<EventDispatcher>) -> Self {
        Self {
            builder: TreeBuilder::new(),
            registry,
            store: ViolationStore::new(),
            stats: StatsCounters::new(),
            events,
        }
    }

    pub fn registry(&self) -> &GuardRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ViolationStore {
        &self.store
    }

    pub fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    pub fn stats(&self) -> GuardStats {
        self.stats.snapshot()
    }

    /// Parse `path` and run every enabled guard that accepts it, in
    /// registration order. Returns `Ok(None)` when the file disappeared
    /// during the pass; its entry is evicted instead of stored.
    pub fn analyze(&self, path: &Path) -> Result<Option<FileReport>, ParseError> {
        let start = Instant::now();
        self.stats.record_started();
        self.events.emit_analysis_started(&AnalysisStartedEvent {
            file: path.to_path_buf(),
        });

        let tree = match self.builder.build(path) {
            Ok(tree) => tree,
            Err(err) => {
                if matches!(err, ParseError::Io { .. }) && !path.exists() {
                    self.handle_removed(path);
                    return Ok(None);
                }
                self.stats.record_error();
                tracing::warn!(file = %path.display(), error = %err, "parse failed");
                self.events.emit_analysis_error(&AnalysisErrorEvent {
                    file: path.to_path_buf(),
                    guard: None,
                    code: err.error_code().to_string(),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        let mut violations = Vec::new();
        let mut guard_errors = 0usize;
        for guard in self.registry.enabled() {
            if !guard.should_process(path) {
                continue;
            }
            let result = catch_unwind(AssertUnwindSafe(|| guard.check(&tree, path)))
                .unwrap_or_else(|payload| {
                    Err(GuardError::Panicked {
                        guard: guard.name().to_string(),
                        message: panic_message(payload.as_ref()),
                    })
                });
            match result {
                Ok(mut found) => violations.append(&mut found),
                Err(err) => {
                    guard_errors += 1;
                    self.stats.record_error();
                    tracing::warn!(
                        file = %path.display(),
                        guard = guard.name(),
                        error = %err,
                        "guard failed; continuing with remaining guards"
                    );
                    self.events.emit_analysis_error(&AnalysisErrorEvent {
                        file: path.to_path_buf(),
                        guard: Some(guard.name().to_string()),
                        code: err.error_code().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
        drop(tree);

        if !path.exists() {
            tracing::debug!(file = %path.display(), "file removed during analysis; discarding batch");
            self.handle_removed(path);
            return Ok(None);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        self.store.replace(path, violations.clone());
        self.stats.record_completed(violations.len());
        tracing::debug!(
            file = %path.display(),
            violation_count = violations.len(),
            pass_duration_ms = duration_ms,
            "analysis pass complete"
        );
        self.events.emit_violations(&ViolationBatchEvent {
            file: path.to_path_buf(),
            violations: violations.clone(),
            duration_ms,
        });

        Ok(Some(FileReport {
            file: path.to_path_buf(),
            violations,
            duration_ms,
            guard_errors,
        }))
    }

    /// Evict a deleted file and publish an empty batch for it.
    pub fn handle_removed(&self, path: &Path) {
        self.store.remove(path);
        self.builder.evict(path);
        tracing::debug!(file = %path.display(), "file removed; violations cleared");
        self.events.emit_file_cleared(&FileClearedEvent {
            file: path.to_path_buf(),
        });
    }

    /// Analyze every supported file under the filter's root. Parse failures
    /// are logged and counted; they do not stop the walk.
    pub fn analyze_tree(&self, filter: &PathFilter) -> Vec<FileReport> {
        let mut reports = Vec::new();
        let walker = ignore::WalkBuilder::new(filter.root())
            .hidden(false)
            .git_ignore(true)
            .build();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "walk error");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if Dialect::from_path(path).is_none() || !filter.matches(path) {
                continue;
            }
            if let Ok(Some(report)) = self.analyze(path) {
                reports.push(report);
            }
        }
        tracing::info!(files = reports.len(), "tree analysis complete");
        reports
    }

    /// Apply the quick-fix of a stored violation, then re-analyze the file so
    /// the store reflects the written text.
    pub fn apply_fix(&self, violation_id: &str) -> Result<FixOutcome, FixError> {
        let violation = self
            .store
            .find(violation_id)
            .ok_or_else(|| FixError::UnknownViolation {
                violation_id: violation_id.to_string(),
            })?;
        let guard = self
            .registry
            .get(&violation.guard)
            .ok_or_else(|| FixError::UnknownGuard {
                guard: violation.guard.clone(),
            })?;

        let outcome = fixes::apply_fix(&self.builder, guard.as_ref(), &violation)?;

        self.store.remove_violation(violation_id);
        self.events.emit_fix_applied(&FixAppliedEvent {
            violation_id: violation_id.to_string(),
            file: violation.file.clone(),
        });
        if outcome.written {
            // Failures are already logged and counted by the pass itself.
            let _ = self.analyze(&violation.file);
        }
        Ok(outcome)
    }

    /// Drop a violation until the file is next analyzed. Returns false for
    /// unknown ids.
    pub fn dismiss(&self, violation_id: &str) -> bool {
        match self.store.remove_violation(violation_id) {
            Some(violation) => {
                self.events.emit_violation_dismissed(&ViolationDismissedEvent {
                    violation_id: violation.id,
                    file: violation.file,
                });
                true
            }
            None => false,
        }
    }
}
