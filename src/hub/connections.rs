//! Connection table and command handling

use super::{ClientCommand, ServerEvent};
use crate::broadcast::{DeliveryError, GroupSink, PriceUpdate};
use crate::data::{AuditAction, AuditRecord, TickStore};
use crate::identity::UserId;
use crate::registry::{ConnectionId, SubscriptionRegistry};
use crate::symbol::normalize_symbol;
use crate::telemetry::{increment, set_gauge, CounterMetric, GaugeMetric};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound queue depth per client
pub const DEFAULT_CLIENT_QUEUE: usize = 256;

/// Command handling failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

struct ClientHandle {
    user_id: UserId,
    tx: mpsc::Sender<ServerEvent>,
}

/// Tracks connected clients and routes events to them
pub struct Hub {
    registry: Arc<SubscriptionRegistry>,
    store: Arc<dyn TickStore>,
    connections: DashMap<ConnectionId, ClientHandle>,
    queue_capacity: usize,
}

impl Hub {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        store: Arc<dyn TickStore>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            registry,
            store,
            connections: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new client; the receiver yields everything sent to it
    pub fn connect(&self, user_id: UserId) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        tracing::info!(connection = %id, user = %user_id, "Client connected");
        self.connections.insert(id, ClientHandle { user_id, tx });
        set_gauge(GaugeMetric::ConnectedClients, self.connections.len() as f64);

        (id, rx)
    }

    /// Forget a client and drop it from every group
    pub fn disconnect(&self, connection: ConnectionId) {
        let user = self
            .connections
            .remove(&connection)
            .map(|(_, handle)| handle.user_id);
        let groups_left = self.registry.remove_connection(connection);
        set_gauge(GaugeMetric::ConnectedClients, self.connections.len() as f64);

        tracing::info!(
            connection = %connection,
            user = ?user.as_ref().map(UserId::as_str),
            groups_left,
            "Client disconnected"
        );
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Parse and execute one raw client frame, returning the reply for the caller.
    ///
    /// The reply is either the acknowledgement or an `Error` event. It never
    /// goes through the outbound queue, so a backlog of price updates cannot
    /// swallow it; the session writes it to the socket itself.
    pub async fn handle_text(&self, connection: ConnectionId, text: &str) -> ServerEvent {
        let result = match serde_json::from_str::<ClientCommand>(text) {
            Ok(command) => self.handle_command(connection, command).await,
            Err(e) => Err(HubError::InvalidCommand(e.to_string())),
        };

        result.unwrap_or_else(|e| {
            tracing::debug!(connection = %connection, error = %e, "Rejected client command");
            ServerEvent::Error {
                message: e.to_string(),
            }
        })
    }

    /// Execute one decoded client command and build its acknowledgement
    pub async fn handle_command(
        &self,
        connection: ConnectionId,
        command: ClientCommand,
    ) -> Result<ServerEvent, HubError> {
        match command {
            ClientCommand::SubscribeToSymbol { symbol } => {
                let symbol = self.subscribe(connection, &symbol).await?;
                Ok(ServerEvent::Subscribed { symbol })
            }
            ClientCommand::UnsubscribeFromSymbol { symbol } => {
                let symbol = self.unsubscribe(connection, &symbol).await?;
                Ok(ServerEvent::Unsubscribed { symbol })
            }
        }
    }

    /// Join a symbol group, then audit. Returns the normalized symbol.
    pub async fn subscribe(
        &self,
        connection: ConnectionId,
        symbol: &str,
    ) -> Result<String, HubError> {
        let (user_id, symbol) = self.prepare(connection, symbol)?;

        let added = self.registry.subscribe(connection, &symbol);
        tracing::info!(user = %user_id, symbol = %symbol, added, "Subscribed to symbol");
        self.audit(user_id, &symbol, AuditAction::Subscribe).await;

        Ok(symbol)
    }

    /// Leave a symbol group, then audit. Returns the normalized symbol.
    pub async fn unsubscribe(
        &self,
        connection: ConnectionId,
        symbol: &str,
    ) -> Result<String, HubError> {
        let (user_id, symbol) = self.prepare(connection, symbol)?;

        let removed = self.registry.unsubscribe(connection, &symbol);
        tracing::info!(user = %user_id, symbol = %symbol, removed, "Unsubscribed from symbol");
        self.audit(user_id, &symbol, AuditAction::Unsubscribe).await;

        Ok(symbol)
    }

    fn prepare(&self, connection: ConnectionId, symbol: &str) -> Result<(UserId, String), HubError> {
        let user_id = self
            .connections
            .get(&connection)
            .map(|handle| handle.user_id.clone())
            .ok_or(HubError::UnknownConnection(connection))?;

        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(HubError::EmptySymbol);
        }
        Ok((user_id, symbol))
    }

    async fn audit(&self, user_id: UserId, symbol: &str, action: AuditAction) {
        let record = AuditRecord {
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            action,
            timestamp: Utc::now(),
        };

        if let Err(e) = self.store.record_subscription_audit(record).await {
            increment(CounterMetric::AuditErrors);
            tracing::error!(user = %user_id, symbol, action = %action, error = %e, "Failed to record subscription audit");
        }
    }

    /// Queue an event for one client without waiting; false if it could not be queued
    fn send_to(&self, connection: ConnectionId, event: ServerEvent) -> bool {
        match self.connections.get(&connection) {
            Some(handle) => match handle.tx.try_send(event) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(connection = %connection, error = %e, "Client queue rejected event");
                    false
                }
            },
            None => false,
        }
    }
}

#[async_trait]
impl GroupSink for Hub {
    async fn deliver(
        &self,
        members: &[ConnectionId],
        update: &PriceUpdate,
    ) -> Result<(), DeliveryError> {
        let failed = members
            .iter()
            .filter(|member| !self.send_to(**member, ServerEvent::PriceUpdate(update.clone())))
            .count();

        if failed > 0 {
            return Err(DeliveryError::Unreachable {
                failed,
                total: members.len(),
            });
        }
        Ok(())
    }
}
