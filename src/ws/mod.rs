//! WebSocket client library
//!
//! Reconnecting WebSocket client used for the upstream feed: fixed
//! reconnect delay, no retry limit, ping/pong keepalive and an observable
//! connection state.

mod client;
mod types;

pub use client::WsClient;
pub use types::{ConnectionState, WsConfig, WsError, WsMessage};
