//! Upstream WebSocket client that never gives up reconnecting

use super::types::{ConnectionState, WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Streams frames from one upstream URL.
///
/// Reconnects after a fixed delay for as long as it runs, and keeps the
/// link alive with ping frames. The current [`ConnectionState`] is
/// published on a watch channel.
pub struct WsClient {
    config: WsConfig,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl WsClient {
    pub fn new(config: WsConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Client with default timings
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Watch the connection state
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Spawn the connection task and hand back its event stream.
    ///
    /// The task stops when `shutdown` flips to true or the receiver is
    /// dropped; nothing else ends it.
    pub fn connect(&self, shutdown: watch::Receiver<bool>) -> mpsc::Receiver<WsMessage> {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            Self::run_connection_loop(config, tx, state, shutdown).await;
        });

        rx
    }

    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
        state: Arc<watch::Sender<ConnectionState>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut attempt: u32 = 0;

        'reconnect: while !*shutdown.borrow() {
            state.send_replace(ConnectionState::Connecting);

            let outcome = tokio::select! {
                result = Self::connect_and_stream(&config, &tx, &state) => result,
                _ = shutdown.changed() => break,
            };
            let Err(e) = outcome else {
                tracing::debug!("Feed receiver gone, stopping upstream client");
                break;
            };

            // A session that reached streaming resets the count
            if *state.borrow() == ConnectionState::Streaming {
                attempt = 0;
            }
            attempt = attempt.saturating_add(1);
            state.send_replace(ConnectionState::BackingOff);
            tracing::warn!(
                error = %e,
                attempt,
                delay_ms = config.reconnect_delay.as_millis() as u64,
                "Upstream connection lost, retrying"
            );

            for event in [WsMessage::Disconnected, WsMessage::Reconnecting { attempt }] {
                if tx.send(event).await.is_err() {
                    break 'reconnect;
                }
            }

            tokio::select! {
                _ = sleep(config.reconnect_delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        state.send_replace(ConnectionState::Disconnected);
        tracing::info!(url = %config.url, "Upstream client stopped");
    }

    /// One connection lifetime: handshake, then forward frames until it breaks.
    ///
    /// `Ok(())` means the consumer hung up. Any transport problem, including
    /// an orderly close from the server, is an error so the caller retries.
    async fn connect_and_stream(
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
        state: &watch::Sender<ConnectionState>,
    ) -> Result<(), WsError> {
        tracing::info!(url = %config.url, "Connecting to upstream feed");

        // An upstream that accepts TCP but never upgrades must not wedge us in Connecting
        let (ws_stream, _response) = timeout(config.connect_timeout, connect_async(config.url.as_str()))
            .await
            .map_err(|_| WsError::ConnectionFailed("handshake timeout".into()))?
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        state.send_replace(ConnectionState::Streaming);
        if tx.send(WsMessage::Connected).await.is_err() {
            return Ok(());
        }

        let mut heartbeat = tokio::time::interval(config.ping_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        heartbeat.tick().await;
        let mut awaiting_pong = false;

        loop {
            tokio::select! {
                frame = read.next() => {
                    let frame = frame
                        .ok_or_else(|| WsError::ConnectionFailed("stream ended".into()))?
                        .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

                    let event = match frame {
                        Message::Text(text) => WsMessage::Text(text),
                        Message::Binary(data) => WsMessage::Binary(data),
                        Message::Ping(payload) => {
                            write.send(Message::Pong(payload)).await.map_err(send_failed)?;
                            continue;
                        }
                        Message::Pong(_) => {
                            awaiting_pong = false;
                            continue;
                        }
                        Message::Close(close) => {
                            tracing::warn!(frame = ?close, "Upstream sent close frame");
                            return Err(WsError::ServerClosed);
                        }
                        Message::Frame(_) => continue,
                    };

                    if tx.send(event).await.is_err() {
                        tracing::debug!("Feed receiver dropped, closing upstream");
                        return Ok(());
                    }
                }

                _ = heartbeat.tick() => {
                    if awaiting_pong {
                        return Err(WsError::PongTimeout);
                    }
                    write.send(Message::Ping(Vec::new())).await.map_err(send_failed)?;
                    awaiting_pong = true;
                }
            }
        }
    }
}

fn send_failed(e: tokio_tungstenite::tungstenite::Error) -> WsError {
    WsError::SendFailed(e.to_string())
}
