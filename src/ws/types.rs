//! WebSocket types and configuration

use std::fmt;
use std::time::Duration;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Fixed delay before every reconnection attempt
    pub reconnect_delay: Duration,
    /// Interval for sending ping frames
    pub ping_interval: Duration,
    /// Upper bound on the TCP connect plus WebSocket upgrade
    pub connect_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_delay: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set reconnection delay
    pub fn reconnect_delay(mut self, d: Duration) -> Self {
        self.reconnect_delay = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }
}

/// Upstream connection lifecycle.
///
/// `Connecting -> Streaming -> BackingOff -> Connecting -> ...` for as long
/// as the client runs; `Disconnected` only before start and after shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Streaming,
    BackingOff,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Streaming => "streaming",
            ConnectionState::BackingOff => "backing_off",
        };
        f.write_str(s)
    }
}

/// WebSocket message types
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Text message
    Text(String),
    /// Binary message
    Binary(Vec<u8>),
    /// Connection established
    Connected,
    /// Connection lost or closed by the server
    Disconnected,
    /// Reconnecting after failure
    Reconnecting { attempt: u32 },
}

/// WebSocket transport errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum WsError {
    /// Connect or read failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Server sent a close frame
    #[error("Connection closed by server")]
    ServerClosed,
    /// Writing a frame failed
    #[error("Send failed: {0}")]
    SendFailed(String),
    /// No pong arrived before the next ping was due
    #[error("Pong timeout")]
    PongTimeout,
}
