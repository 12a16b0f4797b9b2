//! Cache value types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest observed price and volume for one instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Upper-cased trading symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Last price
    pub price: Decimal,
    /// Rolling volume as reported by the feed
    pub volume: Decimal,
    /// Local time the tick was processed
    pub observed_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot stamped with the current time
    pub fn now(symbol: impl Into<String>, price: Decimal, volume: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            observed_at: Utc::now(),
        }
    }
}
