//! WebSocket endpoint, per-connection command handling and periodic stats.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use sentinel_core::config::ChannelConfig;
use sentinel_core::errors::{error_code, ChannelError, FixError, SentinelErrorCode};
use sentinel_core::{GuardStats, Violation};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::broadcaster::{send_to, Broadcaster, Outbox};
use crate::protocol::{ClientMessage, ServerMessage};

/// Operations the channel forwards to the engine. Called from the blocking
/// pool where they may touch the file system.
pub trait CommandHandler: Send + Sync + 'static {
    /// Resolve and apply the violation's quick-fix. Success is announced to
    /// every console through the engine's events.
    fn apply_fix(&self, violation_id: &str) -> Result<(), FixError>;

    /// Returns false for unknown ids.
    fn dismiss(&self, violation_id: &str) -> bool;

    fn stats(&self) -> GuardStats;

    /// Every file currently holding violations.
    fn snapshot(&self) -> Vec<(PathBuf, Vec<Violation>)>;
}

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub stats_interval: Duration,
    pub sync_on_connect: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::from_config(&ChannelConfig::default())
    }
}

impl ChannelSettings {
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self {
            stats_interval: Duration::from_secs(config.effective_stats_interval_secs()),
            sync_on_connect: config.effective_sync_on_connect(),
        }
    }
}

#[derive(Clone)]
struct ChannelState {
    broadcaster: Arc<Broadcaster>,
    handler: Arc<dyn CommandHandler>,
    settings: ChannelSettings,
    shutdown: watch::Receiver<bool>,
}

/// A listening channel. `close` stops accepting, closes every console
/// connection and waits for the server task.
pub struct LiveChannel {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    server: Option<JoinHandle<()>>,
    ticker: JoinHandle<()>,
}

impl LiveChannel {
    /// Bind `host:port` (port 0 picks a free one) and start serving on `/`
    /// and `/ws`.
    pub async fn bind(
        host: &str,
        port: u16,
        settings: ChannelSettings,
        broadcaster: Arc<Broadcaster>,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<Self, ChannelError> {
        let addr = format!("{host}:{port}");
        let bind_err = |source: std::io::Error| ChannelError::Bind {
            addr: addr.clone(),
            source,
        };
        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ticker = spawn_stats_ticker(
            settings.stats_interval,
            Arc::clone(&broadcaster),
            Arc::clone(&handler),
        );
        let state = ChannelState {
            broadcaster,
            handler,
            settings,
            shutdown: shutdown_rx.clone(),
        };
        let app = Router::new()
            .route("/", get(upgrade))
            .route("/ws", get(upgrade))
            .with_state(state);

        let mut stop = shutdown_rx;
        let server = tokio::spawn(async move {
            let serving = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = stop.changed().await;
            });
            if let Err(e) = serving.await {
                tracing::error!(error = %e, "channel server failed");
            }
        });

        tracing::info!(addr = %local_addr, "live channel listening");
        Ok(Self {
            local_addr,
            shutdown: shutdown_tx,
            server: Some(server),
            ticker,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn close(mut self) {
        let _ = self.shutdown.send(true);
        self.ticker.abort();
        if let Some(server) = self.server.take() {
            let _ = server.await;
        }
        tracing::info!(addr = %self.local_addr, "live channel closed");
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        self.ticker.abort();
    }
}

fn spawn_stats_ticker(
    every: Duration,
    broadcaster: Arc<Broadcaster>,
    handler: Arc<dyn CommandHandler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; consoles already got stats on connect.
        interval.tick().await;
        loop {
            interval.tick().await;
            if broadcaster.connection_count() > 0 {
                broadcaster.broadcast(&ServerMessage::Stats(handler.stats()));
            }
        }
    })
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<ChannelState>) -> Response {
    ws.on_upgrade(move |socket| serve_console(socket, state))
}

async fn serve_console(socket: WebSocket, state: ChannelState) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut queue) = mpsc::unbounded_channel::<Arc<str>>();
    let (greeting, mut greeting_queue) = mpsc::unbounded_channel::<Arc<str>>();

    // Greeting frames are written before any broadcast. The snapshot is read
    // after registering, so a newer batch lands after its snapshot entry.
    send_to(&greeting, &ServerMessage::Stats(state.handler.stats()));
    let id = state.broadcaster.register(outbox.clone());
    if state.settings.sync_on_connect {
        for (file, violations) in state.handler.snapshot() {
            send_to(&greeting, &ServerMessage::violations(file, violations));
        }
    }
    drop(greeting);

    let writer = tokio::spawn(async move {
        while let Some(frame) = greeting_queue.recv().await {
            if sink.send(Message::Text(frame.to_string())).await.is_err() {
                let _ = sink.close().await;
                return;
            }
        }
        while let Some(frame) = queue.recv().await {
            if sink.send(Message::Text(frame.to_string())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut shutdown = state.shutdown.clone();
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(&state, &outbox, &text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id = id, error = %e, "console read failed");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }

    state.broadcaster.unregister(id);
    drop(outbox);
    let _ = writer.await;
}

async fn handle_frame(state: &ChannelState, outbox: &Outbox, text: &str) {
    let message = match ClientMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, code = e.error_code(), "ignoring invalid console message");
            return;
        }
    };

    match message {
        ClientMessage::ApplyFix { violation_id } => {
            let handler = Arc::clone(&state.handler);
            let id = violation_id.clone();
            let result = tokio::task::spawn_blocking(move || handler.apply_fix(&id)).await;
            let error = match result {
                Ok(Ok(())) => return,
                Ok(Err(e)) => {
                    tracing::warn!(violation_id = %violation_id, error = %e, "quick-fix failed");
                    e.wire_string()
                }
                Err(e) => {
                    tracing::error!(violation_id = %violation_id, error = %e, "quick-fix task failed");
                    format!("[{}] quick-fix task failed: {e}", error_code::CHANNEL_ERROR)
                }
            };
            send_to(outbox, &ServerMessage::fix_error(violation_id, error));
        }
        ClientMessage::DismissViolation { violation_id } => {
            if !state.handler.dismiss(&violation_id) {
                tracing::debug!(violation_id = %violation_id, "dismiss for unknown violation");
            }
        }
        ClientMessage::RequestStats => {
            send_to(outbox, &ServerMessage::Stats(state.handler.stats()));
        }
        ClientMessage::Ping => {
            send_to(outbox, &ServerMessage::Pong);
        }
        ClientMessage::Pong => {}
    }
}
