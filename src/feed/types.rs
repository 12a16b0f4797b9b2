//! Price feed types

use serde::Deserialize;

/// One ticker entry of a feed batch, numeric fields still as text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickerRecord {
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// Close (current) price
    #[serde(rename = "c")]
    pub price: String,
    /// Rolling base-asset volume
    #[serde(rename = "v")]
    pub volume: String,
}

/// What happened to one record of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Cached and forwarded to the store
    Accepted,
    /// Symbol is not on the watchlist
    NotWatched,
    /// Price or volume is not a decimal
    InvalidNumber,
    /// Record could not be decoded at all
    Malformed,
}

/// Errors that reject a whole feed message
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Payload is not a JSON array
    #[error("failed to decode ticker batch: {0}")]
    Decode(#[from] serde_json::Error),
}
