//! Latest-price cache
//!
//! Holds exactly one snapshot per instrument. The ingestor is the only
//! writer; the broadcaster reads the whole map once per cycle.

mod price_cache;
mod types;

pub use price_cache::PriceCache;
pub use types::Snapshot;
