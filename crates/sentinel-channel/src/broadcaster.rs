//! Connection registry and fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use sentinel_core::events::{
    FileClearedEvent, FixAppliedEvent, SentinelEventHandler, StatsEvent, ViolationBatchEvent,
    ViolationDismissedEvent,
};
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

pub type ConnectionId = u64;

/// Outgoing queue of one connection. Frames are pre-encoded and shared.
pub type Outbox = mpsc::UnboundedSender<Arc<str>>;

/// Every connected console, keyed by connection id. Each message is encoded
/// once and the same frame is queued on every connection.
#[derive(Default)]
pub struct Broadcaster {
    connections: DashMap<ConnectionId, Outbox>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, outbox: Outbox) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(id, outbox);
        tracing::debug!(connection_id = id, "console connected");
        id
    }

    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            tracing::debug!(connection_id = id, "console disconnected");
        }
        removed
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Queue `message` on every connection. Connections whose queue is closed
    /// are dropped. Returns the number of connections reached.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let frame: Arc<str> = match message.encode() {
            Ok(text) => Arc::from(text),
            Err(e) => {
                tracing::error!(kind = message.kind(), error = %e, "failed to encode message");
                return 0;
            }
        };

        let mut dead = Vec::new();
        let mut delivered = 0;
        for entry in self.connections.iter() {
            if entry.value().send(Arc::clone(&frame)).is_ok() {
                delivered += 1;
            } else {
                dead.push(*entry.key());
            }
        }
        for id in dead {
            self.connections.remove(&id);
            tracing::debug!(connection_id = id, "dropped closed connection");
        }
        delivered
    }
}

/// Queue one message on a single connection's outbox.
pub fn send_to(outbox: &Outbox, message: &ServerMessage) -> bool {
    match message.encode() {
        Ok(text) => outbox.send(Arc::from(text)).is_ok(),
        Err(e) => {
            tracing::error!(kind = message.kind(), error = %e, "failed to encode message");
            false
        }
    }
}

impl SentinelEventHandler for Broadcaster {
    fn on_violations(&self, event: &ViolationBatchEvent) {
        self.broadcast(&ServerMessage::violations(
            event.file.clone(),
            event.violations.clone(),
        ));
    }

    fn on_file_cleared(&self, event: &FileClearedEvent) {
        self.broadcast(&ServerMessage::violations(event.file.clone(), Vec::new()));
    }

    fn on_fix_applied(&self, event: &FixAppliedEvent) {
        self.broadcast(&ServerMessage::fix_applied(event.violation_id.clone()));
    }

    fn on_violation_dismissed(&self, event: &ViolationDismissedEvent) {
        self.broadcast(&ServerMessage::violation_dismissed(
            event.violation_id.clone(),
        ));
    }

    fn on_stats(&self, event: &StatsEvent) {
        self.broadcast(&ServerMessage::Stats(event.stats.clone()));
    }
}
