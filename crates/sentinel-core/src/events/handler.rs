//! SentinelEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Trait for observing Sentinel events.
///
/// Handlers only override what they care about. `Send + Sync` because
/// events are emitted from whichever blocking worker ran the pass.
pub trait SentinelEventHandler: Send + Sync {
    fn on_analysis_started(&self, _event: &AnalysisStartedEvent) {}
    fn on_violations(&self, _event: &ViolationBatchEvent) {}
    fn on_file_cleared(&self, _event: &FileClearedEvent) {}
    fn on_analysis_error(&self, _event: &AnalysisErrorEvent) {}
    fn on_fix_applied(&self, _event: &FixAppliedEvent) {}
    fn on_violation_dismissed(&self, _event: &ViolationDismissedEvent) {}
    fn on_stats(&self, _event: &StatsEvent) {}
}
