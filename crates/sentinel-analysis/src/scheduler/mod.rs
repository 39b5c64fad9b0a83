//! Watch scheduler: glob path filter, per-path debounce and the recursive OS
//! watcher that feeds analysis passes.

pub mod debouncer;
pub mod path_filter;
pub mod watcher;

pub use debouncer::Debouncer;
pub use path_filter::PathFilter;
pub use watcher::{FileEvent, FileEventKind, WatchHandle, WatchScheduler};
