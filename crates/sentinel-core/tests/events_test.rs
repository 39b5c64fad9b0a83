//! Event dispatcher tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sentinel_core::events::*;

#[derive(Default)]
struct Counter {
    batches: AtomicUsize,
    cleared: AtomicUsize,
}

impl SentinelEventHandler for Counter {
    fn on_violations(&self, _event: &ViolationBatchEvent) {
        self.batches.fetch_add(1, Ordering::SeqCst);
    }

    fn on_file_cleared(&self, _event: &FileClearedEvent) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }
}

struct Panicker;

impl SentinelEventHandler for Panicker {
    fn on_violations(&self, _event: &ViolationBatchEvent) {
        panic!("handler bug");
    }
}

fn batch() -> ViolationBatchEvent {
    ViolationBatchEvent {
        file: PathBuf::from("src/lib/orders.ts"),
        violations: Vec::new(),
        duration_ms: 1,
    }
}

#[test]
fn test_empty_dispatcher_is_noop() {
    let dispatcher = EventDispatcher::new();
    assert_eq!(dispatcher.handler_count(), 0);
    dispatcher.emit_violations(&batch());
}

#[test]
fn test_events_reach_every_handler() {
    let a = Arc::new(Counter::default());
    let b = Arc::new(Counter::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(a.clone());
    dispatcher.register(b.clone());

    dispatcher.emit_violations(&batch());
    dispatcher.emit_file_cleared(&FileClearedEvent {
        file: PathBuf::from("gone.ts"),
    });

    for c in [&a, &b] {
        assert_eq!(c.batches.load(Ordering::SeqCst), 1);
        assert_eq!(c.cleared.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_panicking_handler_is_isolated() {
    let counter = Arc::new(Counter::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(Panicker));
    dispatcher.register(counter.clone());

    dispatcher.emit_violations(&batch());
    assert_eq!(counter.batches.load(Ordering::SeqCst), 1);
}
