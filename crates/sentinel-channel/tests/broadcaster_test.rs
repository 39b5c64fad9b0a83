//! Fan-out and event mapping tests.

use std::path::PathBuf;
use std::sync::Arc;

use sentinel_channel::protocol::ServerMessage;
use sentinel_channel::Broadcaster;
use sentinel_core::events::{
    FileClearedEvent, FixAppliedEvent, SentinelEventHandler, ViolationDismissedEvent,
};
use tokio::sync::mpsc;

fn frame_json(frame: &str) -> serde_json::Value {
    serde_json::from_str(frame).unwrap()
}

/// Every connection receives the very same encoded frame.
#[test]
fn test_broadcast_reaches_every_connection() {
    let broadcaster = Broadcaster::new();
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let a = broadcaster.register(tx_a);
    let b = broadcaster.register(tx_b);
    assert_ne!(a, b);

    let delivered = broadcaster.broadcast(&ServerMessage::fix_applied("v1"));
    assert_eq!(delivered, 2);
    let frame_a = rx_a.try_recv().unwrap();
    let frame_b = rx_b.try_recv().unwrap();
    assert!(Arc::ptr_eq(&frame_a, &frame_b));
    assert_eq!(frame_json(&frame_a)["type"], "fix-applied");
}

/// A connection whose queue is gone is dropped on the next broadcast.
#[test]
fn test_closed_connections_are_dropped() {
    let broadcaster = Broadcaster::new();
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    broadcaster.register(tx_a);
    broadcaster.register(tx_b);
    drop(rx_a);

    assert_eq!(broadcaster.broadcast(&ServerMessage::Pong), 1);
    assert_eq!(broadcaster.connection_count(), 1);
    assert!(rx_b.try_recv().is_ok());
}

#[test]
fn test_unregister() {
    let broadcaster = Broadcaster::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let id = broadcaster.register(tx);
    assert!(broadcaster.unregister(id));
    assert!(!broadcaster.unregister(id));
    assert_eq!(broadcaster.broadcast(&ServerMessage::Pong), 0);
}

/// A cleared file goes out as an empty violations batch.
#[test]
fn test_event_mapping() {
    let broadcaster = Broadcaster::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    broadcaster.register(tx);

    broadcaster.on_file_cleared(&FileClearedEvent {
        file: PathBuf::from("src/lib/gone.ts"),
    });
    let cleared = frame_json(&rx.try_recv().unwrap());
    assert_eq!(cleared["type"], "violations");
    assert_eq!(cleared["data"]["file"], "src/lib/gone.ts");
    assert_eq!(cleared["data"]["violations"], serde_json::json!([]));

    broadcaster.on_fix_applied(&FixAppliedEvent {
        violation_id: "v1".into(),
        file: PathBuf::from("a.ts"),
    });
    assert_eq!(frame_json(&rx.try_recv().unwrap())["data"]["violationId"], "v1");

    broadcaster.on_violation_dismissed(&ViolationDismissedEvent {
        violation_id: "v2".into(),
        file: PathBuf::from("a.ts"),
    });
    assert_eq!(
        frame_json(&rx.try_recv().unwrap())["type"],
        "violation-dismissed"
    );
}
