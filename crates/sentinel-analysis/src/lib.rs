//! sentinel-analysis: everything between a file on disk and a batch of violations.
//!
//! - `tree`: TypeScript/TSX syntax trees, query helpers, shared semantic index
//! - `guards`: the guard contract, registry and the built-in guards
//! - `fixes`: edit validation and atomic quick-fix application
//! - `pipeline`: per-file analysis passes, violation store, statistics
//! - `scheduler`: path filtering, per-path debounce and the OS watcher

pub mod fixes;
pub mod guards;
pub mod pipeline;
pub mod scheduler;
pub mod tree;

pub use guards::{Guard, GuardRegistry};
pub use pipeline::{Analyzer, FileReport, ViolationStore};
pub use scheduler::{PathFilter, WatchScheduler};
pub use tree::{Dialect, SourceTree, TreeBuilder};
