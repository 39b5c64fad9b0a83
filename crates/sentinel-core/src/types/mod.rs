//! Shared record types.

pub mod stats;
pub mod violation;

pub use stats::{GuardStats, StatsCounters};
pub use violation::{Category, FixDescriptor, Severity, TextEdit, Violation};
