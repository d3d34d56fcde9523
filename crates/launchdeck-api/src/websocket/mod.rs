//! Realtime push channel.
//!
//! Every successful mutation is broadcast to all open `/ws` connections as a
//! JSON envelope `{type, ...payload}`. There is no replay: a client that is
//! disconnected misses what happened in the meantime.

mod handler;
mod hub;
mod message;

pub use handler::ws_handler;
pub use hub::{BroadcastHub, Subscription};
pub use message::{Event, WsMessage};
