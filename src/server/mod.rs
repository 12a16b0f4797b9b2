//! Consumer-facing WebSocket server
//!
//! Accepts client connections, resolves their identity once during the
//! handshake, then bridges frames between the socket and the [`Hub`].

mod handshake;

pub use handshake::extract_credential;

use crate::hub::{Hub, ServerEvent};
use crate::identity::IdentityProvider;
use futures_util::{Sink, SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Listens for consumers and spawns one session task per connection
pub struct RelayServer {
    listener: TcpListener,
    hub: Arc<Hub>,
    identity: Arc<dyn IdentityProvider>,
}

impl RelayServer {
    pub async fn bind(
        addr: &str,
        hub: Arc<Hub>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            hub,
            identity,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let addr = self.listener.local_addr().ok();
        tracing::info!(addr = ?addr, "Relay server listening");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let hub = self.hub.clone();
                            let identity = self.identity.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, peer, hub, identity, shutdown).await {
                                    tracing::debug!(peer = %peer, error = %e, "Client session ended with error");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("Relay server stopped");
    }
}

/// Drive one client session from handshake to disconnect
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<Hub>,
    identity: Arc<dyn IdentityProvider>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let mut credential = None;
    let ws_stream = accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            credential = extract_credential(request);
            Ok(response)
        },
    )
    .await?;

    let user_id = identity.identify(credential.as_deref());
    tracing::debug!(peer = %peer, user = %user_id, "Handshake complete");

    let (connection, mut events) = hub.connect(user_id);
    let (mut write, mut read) = ws_stream.split();

    let result = loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = hub.handle_text(connection, &text).await;
                        if let Err(e) = send_event(&mut write, &reply).await {
                            break Err(e);
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            break Err(e.into());
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                }
            }

            event = events.recv() => {
                let Some(event) = event else { break Ok(()) };
                if let Err(e) = send_event(&mut write, &event).await {
                    break Err(e);
                }
            }

            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                break Ok(());
            }
        }
    };

    hub.disconnect(connection);
    result
}

async fn send_event<S>(write: &mut S, event: &ServerEvent) -> Result<(), ServerError>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let payload = serde_json::to_string(event)?;
    write.send(Message::Text(payload)).await?;
    Ok(())
}
