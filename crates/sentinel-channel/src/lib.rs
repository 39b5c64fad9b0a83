//! sentinel-channel: the live channel between the engine and its consoles.
//!
//! - `protocol`: wire envelopes and the closed client/server message unions
//! - `broadcaster`: connection registry and fan-out, fed by engine events
//! - `server`: axum WebSocket endpoint, command dispatch, periodic stats

pub mod broadcaster;
pub mod protocol;
pub mod server;

pub use broadcaster::{Broadcaster, ConnectionId};
pub use protocol::{ClientMessage, ServerMessage};
pub use server::{ChannelSettings, CommandHandler, LiveChannel};
