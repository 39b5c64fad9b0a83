//! Event system: handler trait, dispatcher, payload types.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::SentinelEventHandler;
pub use types::*;
