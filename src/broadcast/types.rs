//! Fan-out types

use crate::cache::Snapshot;
use crate::registry::ConnectionId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outbound price event for one symbol group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    /// Broadcast time, not the time the tick was observed
    pub timestamp: DateTime<Utc>,
}

impl PriceUpdate {
    pub fn from_snapshot(snapshot: Snapshot, broadcast_at: DateTime<Utc>) -> Self {
        Self {
            symbol: snapshot.symbol,
            price: snapshot.price,
            volume: snapshot.volume,
            timestamp: broadcast_at,
        }
    }
}

/// Delivery failures for one group
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Some members could not be reached
    #[error("{failed} of {total} members unreachable")]
    Unreachable { failed: usize, total: usize },
    /// The transport itself is down
    #[error("transport unavailable: {0}")]
    Transport(String),
}

/// Transport-side delivery of one event to a group of connections
#[async_trait]
pub trait GroupSink: Send + Sync {
    async fn deliver(&self, members: &[ConnectionId], update: &PriceUpdate)
        -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_update_from_snapshot() {
        let snapshot = Snapshot::now("BTCUSDT", dec!(67000), dec!(12));
        let at = Utc::now();
        let update = PriceUpdate::from_snapshot(snapshot, at);

        assert_eq!(update.symbol, "BTCUSDT");
        assert_eq!(update.price, dec!(67000));
        assert_eq!(update.timestamp, at);
    }

    #[test]
    fn test_delivery_error_display() {
        let err = DeliveryError::Unreachable { failed: 1, total: 3 };
        assert_eq!(err.to_string(), "1 of 3 members unreachable");
    }
}
