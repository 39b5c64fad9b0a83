//! Analysis pipeline: one pass per file, the per-file violation store, and
//! process-wide statistics.

pub mod analyzer;
pub mod store;

pub use analyzer::{Analyzer, FileReport};
pub use store::ViolationStore;
