//! Integration tests for stream ingestion against a local feed server

use crypto_relay::cache::PriceCache;
use crypto_relay::data::MemoryStore;
use crypto_relay::feed::{StreamIngestor, Watchlist};
use crypto_relay::ws::{ConnectionState, WsConfig};
use futures_util::SinkExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Serve one connection per script; each script is sent and the connection closed
async fn spawn_feed(scripts: Vec<Vec<&'static str>>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        for script in scripts {
            let (stream, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let mut ws = accept_async(stream).await.unwrap();
            for frame in script {
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            let _ = ws.close(None).await;
        }
        // Keep accepting so late reconnects do not error out the test
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });

    (format!("ws://{}", addr), connections)
}

fn ingestor(url: &str, cache: Arc<PriceCache>, store: Arc<MemoryStore>) -> Arc<StreamIngestor> {
    Arc::new(StreamIngestor::new(
        WsConfig::new(url).reconnect_delay(Duration::from_millis(50)),
        cache,
        Watchlist::new(["BTCUSDT", "ETHUSDT"]),
        store,
    ))
}

async fn wait_for_price(cache: &PriceCache, symbol: &str, price: Decimal) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if cache.get(symbol).map(|s| s.price) == Some(price) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{} never reached {}", symbol, price));
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let (url, connections) = spawn_feed(vec![
        vec![r#"[{"s":"BTCUSDT","c":"67000.00","v":"100"}]"#],
        vec![r#"[{"s":"BTCUSDT","c":"67100.50","v":"101"}]"#],
    ])
    .await;

    let cache = Arc::new(PriceCache::new());
    let store = Arc::new(MemoryStore::new());
    let ingestor = ingestor(&url, cache.clone(), store.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = ingestor.clone();
    let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    wait_for_price(&cache, "BTCUSDT", dec!(67000.00)).await;
    wait_for_price(&cache, "BTCUSDT", dec!(67100.50)).await;
    assert!(connections.load(Ordering::SeqCst) >= 2);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("ingestor did not stop")
        .unwrap();

    let ticks = store.ticks().await;
    assert_eq!(ticks.len(), 2);
    assert_eq!(ticks[1].price, dec!(67100.50));
}

#[tokio::test]
async fn test_bad_frame_keeps_connection() {
    let (url, connections) = spawn_feed(vec![vec![
        "not json at all",
        r#"{"s":"BTCUSDT"}"#,
        r#"[{"s":"ETHUSDT","c":"3500","v":"7"},{"s":"DOGEUSDT","c":"0.1","v":"1"}]"#,
    ]])
    .await;

    let cache = Arc::new(PriceCache::new());
    let ingestor = ingestor(&url, cache.clone(), Arc::new(MemoryStore::new()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = ingestor.clone();
    let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    wait_for_price(&cache, "ETHUSDT", dec!(3500)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    assert!(cache.get("DOGEUSDT").is_none());

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_state_reaches_streaming_and_stops() {
    let (url, _connections) = spawn_feed(vec![vec![r#"[]"#]]).await;

    let cache = Arc::new(PriceCache::new());
    let ingestor = ingestor(&url, cache, Arc::new(MemoryStore::new()));
    let mut state = ingestor.state();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = ingestor.clone();
    let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s != ConnectionState::Disconnected),
    )
    .await
    .expect("client never left Disconnected")
    .unwrap();

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await
    .expect("client did not stop")
    .unwrap();
}
