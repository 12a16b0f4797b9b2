//! Binance mini-ticker stream decoding

use super::{IngestError, TickerRecord};
use serde_json::Value;

/// Binance all-market mini-ticker stream (one array of tickers per second)
pub const BINANCE_MINI_TICKER_URL: &str = "wss://stream.binance.com:9443/ws/!miniTicker@arr";

/// Split a feed message into per-record decode results.
///
/// The outer payload must be a JSON array; anything else fails the whole
/// batch. Each element is decoded on its own so one bad entry cannot take
/// its siblings down with it.
pub fn decode_batch(
    msg: &str,
) -> Result<Vec<Result<TickerRecord, serde_json::Error>>, IngestError> {
    let entries: Vec<Value> = serde_json::from_str(msg)?;
    Ok(entries.into_iter().map(serde_json::from_value).collect())
}
