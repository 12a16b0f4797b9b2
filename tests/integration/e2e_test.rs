//! End-to-end integration tests: feed server -> relay -> WebSocket client

use crypto_relay::broadcast::BroadcastScheduler;
use crypto_relay::cache::PriceCache;
use crypto_relay::config::Config;
use crypto_relay::data::{AuditAction, MemoryStore};
use crypto_relay::feed::{StreamIngestor, Watchlist};
use crypto_relay::hub::{Hub, ServerEvent};
use crypto_relay::identity::StaticTokenIdentity;
use crypto_relay::registry::SubscriptionRegistry;
use crypto_relay::server::RelayServer;
use futures_util::{SinkExt, Stream, StreamExt};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::{accept_async, connect_async, tungstenite::Message};

#[test]
fn test_config_example_loads() {
    let config: Config = toml::from_str(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.feed.watchlist.len(), 5);
    assert_eq!(config.broadcast.interval_ms, 500);
    assert!(config.server.tokens.is_empty());
}

/// Upstream stand-in: sends one batch, then idles until the client leaves
async fn spawn_feed(batch: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else { return };
                if ws.send(Message::Text(batch.to_string())).await.is_err() {
                    return;
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    format!("ws://{}", addr)
}

async fn next_event<S>(ws: &mut S) -> ServerEvent
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_client_receives_subscribed_prices() {
    let feed_url = spawn_feed(
        r#"[{"s":"BTCUSDT","c":"67000.00","v":"12345.67"},{"s":"DOGEUSDT","c":"0.1","v":"1"}]"#,
    )
    .await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cache = Arc::new(PriceCache::new());
    let registry = Arc::new(SubscriptionRegistry::new());
    let store = Arc::new(MemoryStore::new());
    let hub = Arc::new(Hub::new(registry.clone(), store.clone(), 64));

    let mut tokens = HashMap::new();
    tokens.insert("secret-1".to_string(), "user-001".to_string());
    let server = RelayServer::bind(
        "127.0.0.1:0",
        hub.clone(),
        Arc::new(StaticTokenIdentity::new(tokens)),
    )
    .await
    .unwrap();
    let relay_addr = server.local_addr().unwrap();

    let ingestor = StreamIngestor::new(
        crypto_relay::ws::WsConfig::new(feed_url),
        cache.clone(),
        Watchlist::default(),
        store.clone(),
    );
    let scheduler = BroadcastScheduler::new(cache, registry, hub.clone(), Duration::from_millis(50));

    let tasks = vec![
        tokio::spawn(server.run(shutdown_rx.clone())),
        tokio::spawn({
            let shutdown = shutdown_rx.clone();
            async move { ingestor.run(shutdown).await }
        }),
        tokio::spawn({
            let shutdown = shutdown_rx.clone();
            async move { scheduler.run(shutdown).await }
        }),
    ];

    let (mut client, _) = connect_async(format!("ws://{}/prices?access_token=secret-1", relay_addr))
        .await
        .unwrap();

    client
        .send(Message::Text(r#"{"type":"SubscribeToSymbol","symbol":"btcusdt"}"#.to_string()))
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut client).await,
        ServerEvent::Subscribed {
            symbol: "BTCUSDT".into()
        }
    );

    match next_event(&mut client).await {
        ServerEvent::PriceUpdate(update) => {
            assert_eq!(update.symbol, "BTCUSDT");
            assert_eq!(update.price, dec!(67000.00));
        }
        other => panic!("expected price update, got {:?}", other),
    }

    client.send(Message::Text("garbage".to_string())).await.unwrap();
    loop {
        match next_event(&mut client).await {
            ServerEvent::Error { .. } => break,
            ServerEvent::PriceUpdate(_) => continue,
            other => panic!("expected error event, got {:?}", other),
        }
    }

    let audits = store.audits().await;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].user_id, "user-001");
    assert_eq!(audits[0].action, AuditAction::Subscribe);

    client.close(None).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server kept the closed connection");

    shutdown_tx.send(true).unwrap();
    for task in tasks {
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("task did not stop")
            .unwrap();
    }
}

#[tokio::test]
async fn test_unknown_token_connects_as_anonymous() {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let registry = Arc::new(SubscriptionRegistry::new());
    let store = Arc::new(MemoryStore::new());
    let hub = Arc::new(Hub::new(registry, store.clone(), 16));

    let server = RelayServer::bind(
        "127.0.0.1:0",
        hub,
        Arc::new(StaticTokenIdentity::default()),
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    let task = tokio::spawn(server.run(shutdown_rx));

    let (mut client, _) = connect_async(format!("ws://{}/prices?access_token=bogus", addr))
        .await
        .unwrap();
    client
        .send(Message::Text(r#"{"type":"SubscribeToSymbol","symbol":"ETHUSDT"}"#.to_string()))
        .await
        .unwrap();
    assert!(matches!(next_event(&mut client).await, ServerEvent::Subscribed { .. }));

    assert_eq!(store.audits().await[0].user_id, "anonymous");

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
