//! Fixed set of symbols eligible for caching

use crate::symbol::normalize_symbol;
use std::collections::HashSet;

/// High-volume USDT pairs ingested when no watchlist is configured
pub const DEFAULT_WATCHLIST: [&str; 5] = ["BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT"];

/// Symbols the ingestor accepts; everything else is dropped before the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchlist {
    symbols: HashSet<String>,
}

impl Watchlist {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: symbols
                .into_iter()
                .map(|s| normalize_symbol(s.as_ref()))
                .collect(),
        }
    }

    /// Exact match against the upper-cased symbol
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Sorted symbols, for display
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.symbols.iter().cloned().collect();
        symbols.sort();
        symbols
    }
}

impl Default for Watchlist {
    fn default() -> Self {
        Self::new(DEFAULT_WATCHLIST)
    }
}
