//! Upstream price feed
//!
//! Consumes the Binance all-market mini-ticker stream, keeps only the
//! watchlisted symbols, and writes each accepted tick to the price cache
//! and the tick store.

mod binance;
mod ingestor;
mod types;
mod watchlist;

pub use binance::{decode_batch, BINANCE_MINI_TICKER_URL};
pub use ingestor::{BatchSummary, StreamIngestor};
pub use types::{IngestError, RecordOutcome, TickerRecord};
pub use watchlist::{Watchlist, DEFAULT_WATCHLIST};
