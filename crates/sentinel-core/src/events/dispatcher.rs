//! EventDispatcher: synchronous fan-out with panic isolation.

use std::sync::Arc;

use super::handler::SentinelEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
///
/// Handlers are registered while the engine is assembled; the dispatcher is
/// then shared immutably. With no handlers `emit` is an empty loop.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn SentinelEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn SentinelEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// A panicking handler is logged and does not keep the remaining
    /// handlers from receiving the event.
    fn emit<F: Fn(&dyn SentinelEventHandler)>(&self, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::error!("event handler panicked; continuing with remaining handlers");
            }
        }
    }

    pub fn emit_analysis_started(&self, event: &AnalysisStartedEvent) {
        self.emit(|h| h.on_analysis_started(event));
    }

    pub fn emit_violations(&self, event: &ViolationBatchEvent) {
        self.emit(|h| h.on_violations(event));
    }

    pub fn emit_file_cleared(&self, event: &FileClearedEvent) {
        self.emit(|h| h.on_file_cleared(event));
    }

    pub fn emit_analysis_error(&self, event: &AnalysisErrorEvent) {
        self.emit(|h| h.on_analysis_error(event));
    }

    pub fn emit_fix_applied(&self, event: &FixAppliedEvent) {
        self.emit(|h| h.on_fix_applied(event));
    }

    pub fn emit_violation_dismissed(&self, event: &ViolationDismissedEvent) {
        self.emit(|h| h.on_violation_dismissed(event));
    }

    pub fn emit_stats(&self, event: &StatsEvent) {
        self.emit(|h| h.on_stats(event));
    }
}
