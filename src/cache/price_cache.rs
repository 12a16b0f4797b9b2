//! Sharded in-memory map of symbol -> latest snapshot

use super::Snapshot;
use dashmap::DashMap;

/// Concurrent latest-value cache.
///
/// Each entry is replaced wholesale under its shard lock, so readers never
/// see a price from one tick paired with the volume of another. There is
/// no eviction: entries live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct PriceCache {
    entries: DashMap<String, Snapshot>,
}

impl PriceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Overwrite the snapshot for `snapshot.symbol` (last write wins)
    pub fn set(&self, snapshot: Snapshot) {
        self.entries.insert(snapshot.symbol.clone(), snapshot);
    }

    /// Current snapshot for a symbol, if one has been observed
    pub fn get(&self, symbol: &str) -> Option<Snapshot> {
        self.entries.get(symbol).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of every entry.
    ///
    /// Shards are visited one at a time; the copy is consistent per entry,
    /// not across symbols.
    pub fn snapshot_all(&self) -> Vec<Snapshot> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of cached symbols
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no tick has been accepted yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn test_get_absent() {
        let cache = PriceCache::new();
        assert!(cache.get("BTCUSDT").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_then_get() {
        let cache = PriceCache::new();
        cache.set(Snapshot::now("BTCUSDT", dec!(67000.00), dec!(12345.67)));

        let snap = cache.get("BTCUSDT").unwrap();
        assert_eq!(snap.price, dec!(67000.00));
        assert_eq!(snap.volume, dec!(12345.67));
    }

    #[test]
    fn test_set_replaces_wholesale() {
        let cache = PriceCache::new();
        cache.set(Snapshot::now("ETHUSDT", dec!(3000), dec!(10)));
        cache.set(Snapshot::now("ETHUSDT", dec!(3100), dec!(11)));

        let snap = cache.get("ETHUSDT").unwrap();
        assert_eq!(snap.price, dec!(3100));
        assert_eq!(snap.volume, dec!(11));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_snapshot_all() {
        let cache = PriceCache::new();
        cache.set(Snapshot::now("BTCUSDT", dec!(1), dec!(1)));
        cache.set(Snapshot::now("ETHUSDT", dec!(2), dec!(2)));

        let mut symbols: Vec<String> = cache.snapshot_all().into_iter().map(|s| s.symbol).collect();
        symbols.sort();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_concurrent_writer_never_tears() {
        // Writer keeps price == volume; a torn read would break the equality
        let cache = Arc::new(PriceCache::new());
        let writer_cache = cache.clone();

        let writer = std::thread::spawn(move || {
            for i in 0..10_000i64 {
                let v = rust_decimal::Decimal::from(i);
                writer_cache.set(Snapshot::now("BTCUSDT", v, v));
            }
        });

        for _ in 0..10_000 {
            for snap in cache.snapshot_all() {
                assert_eq!(snap.price, snap.volume);
            }
        }

        writer.join().unwrap();
        let last = cache.get("BTCUSDT").unwrap();
        assert_eq!(last.price, dec!(9999));
    }
}
