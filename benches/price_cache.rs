//! Benchmarks for the price cache and ticker batch decoding

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crypto_relay::cache::{PriceCache, Snapshot};
use crypto_relay::feed::decode_batch;
use rust_decimal_macros::dec;

const SYMBOLS: [&str; 5] = ["BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT"];

fn benchmark_cache_set(c: &mut Criterion) {
    let cache = PriceCache::new();

    c.bench_function("price_cache_set", |b| {
        b.iter(|| cache.set(black_box(Snapshot::now("BTCUSDT", dec!(67000.12), dec!(1.5)))))
    });
}

fn benchmark_snapshot_all(c: &mut Criterion) {
    let cache = PriceCache::new();
    for symbol in SYMBOLS {
        cache.set(Snapshot::now(symbol, dec!(100), dec!(1)));
    }

    c.bench_function("price_cache_snapshot_all", |b| b.iter(|| black_box(cache.snapshot_all())));
}

fn benchmark_decode_batch(c: &mut Criterion) {
    // Full-market batches carry a few hundred records
    let record = r#"{"e":"24hrMiniTicker","E":1700000000000,"s":"BTCUSDT","c":"67000.00","o":"66000.00","h":"68000.00","l":"65000.00","v":"12345.67","q":"800000000.00"}"#;
    let batch = format!("[{}]", vec![record; 400].join(","));

    c.bench_function("decode_batch_400", |b| {
        b.iter(|| decode_batch(black_box(&batch)))
    });
}

criterion_group!(
    benches,
    benchmark_cache_set,
    benchmark_snapshot_all,
    benchmark_decode_batch
);
criterion_main!(benches);
