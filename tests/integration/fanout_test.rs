//! Integration tests for subscription fan-out through the hub

use crypto_relay::broadcast::BroadcastScheduler;
use crypto_relay::cache::{PriceCache, Snapshot};
use crypto_relay::data::{AuditAction, HistoryQuery, MemoryStore};
use crypto_relay::hub::{Hub, ServerEvent};
use crypto_relay::identity::UserId;
use crypto_relay::registry::SubscriptionRegistry;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::watch;

struct Relay {
    cache: Arc<PriceCache>,
    registry: Arc<SubscriptionRegistry>,
    store: Arc<MemoryStore>,
    hub: Arc<Hub>,
    scheduler: Arc<BroadcastScheduler>,
}

fn relay() -> Relay {
    let cache = Arc::new(PriceCache::new());
    let registry = Arc::new(SubscriptionRegistry::new());
    let store = Arc::new(MemoryStore::new());
    let hub = Arc::new(Hub::new(registry.clone(), store.clone(), 64));
    let scheduler = Arc::new(BroadcastScheduler::new(
        cache.clone(),
        registry.clone(),
        hub.clone(),
        Duration::from_millis(20),
    ));
    Relay {
        cache,
        registry,
        store,
        hub,
        scheduler,
    }
}

#[tokio::test]
async fn test_only_subscribers_receive_updates() {
    let relay = relay();
    let (a, mut rx_a) = relay.hub.connect(UserId::new("user-a"));
    let (_b, mut rx_b) = relay.hub.connect(UserId::new("user-b"));

    let reply = relay
        .hub
        .handle_text(a, r#"{"type":"SubscribeToSymbol","symbol":"btcusdt"}"#)
        .await;
    assert_eq!(
        reply,
        ServerEvent::Subscribed {
            symbol: "BTCUSDT".into()
        }
    );

    relay
        .cache
        .set(Snapshot::now("BTCUSDT", dec!(67000.00), dec!(12345.67)));
    let report = relay.scheduler.broadcast_cycle().await;
    assert_eq!(report.delivered, 1);

    match rx_a.recv().await {
        Some(ServerEvent::PriceUpdate(update)) => {
            assert_eq!(update.symbol, "BTCUSDT");
            assert_eq!(update.price, dec!(67000.00));
            assert_eq!(update.volume, dec!(12345.67));
        }
        other => panic!("expected price update, got {:?}", other),
    }
    assert_eq!(rx_b.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_unsubscribe_stops_updates() {
    let relay = relay();
    let (a, mut rx_a) = relay.hub.connect(UserId::anonymous());

    relay.hub.subscribe(a, "ETHUSDT").await.unwrap();
    relay.hub.unsubscribe(a, "ethusdt").await.unwrap();

    relay.cache.set(Snapshot::now("ETHUSDT", dec!(3500), dec!(1)));
    let report = relay.scheduler.broadcast_cycle().await;

    assert_eq!(report.events(), 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(rx_a.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_disconnected_client_leaves_every_group() {
    let relay = relay();
    let (a, _rx_a) = relay.hub.connect(UserId::anonymous());
    let (b, mut rx_b) = relay.hub.connect(UserId::anonymous());

    for symbol in ["BTCUSDT", "ETHUSDT"] {
        relay.hub.subscribe(a, symbol).await.unwrap();
    }
    relay.hub.subscribe(b, "BTCUSDT").await.unwrap();

    relay.hub.disconnect(a);
    assert!(relay.registry.symbols_for(a).is_empty());
    assert_eq!(relay.registry.member_count("BTCUSDT"), 1);

    relay.cache.set(Snapshot::now("BTCUSDT", dec!(1), dec!(1)));
    relay.cache.set(Snapshot::now("ETHUSDT", dec!(2), dec!(2)));
    let report = relay.scheduler.broadcast_cycle().await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 0);
    assert!(matches!(rx_b.recv().await, Some(ServerEvent::PriceUpdate(_))));
}

#[tokio::test]
async fn test_subscription_audit_trail() {
    let relay = relay();
    let (a, _rx_a) = relay.hub.connect(UserId::new("user-001"));

    relay.hub.subscribe(a, "solusdt").await.unwrap();
    relay.hub.subscribe(a, "SOLUSDT").await.unwrap();
    relay.hub.unsubscribe(a, "SOLUSDT").await.unwrap();

    let audits = relay.store.subscription_audits(Some("user-001")).await.unwrap();
    assert_eq!(audits.len(), 3);
    assert!(audits.iter().all(|a| a.symbol == "SOLUSDT"));
    assert_eq!(
        audits
            .iter()
            .filter(|a| a.action == AuditAction::Subscribe)
            .count(),
        2
    );
    assert!(relay.store.subscription_audits(Some("someone-else")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_running_scheduler_coalesces_to_latest() {
    let relay = relay();
    let (a, mut rx_a) = relay.hub.connect(UserId::anonymous());
    relay.hub.subscribe(a, "BTCUSDT").await.unwrap();

    for i in 1..=50 {
        relay
            .cache
            .set(Snapshot::now("BTCUSDT", rust_decimal::Decimal::from(i), dec!(1)));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = relay.scheduler.clone();
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let update = tokio::time::timeout(Duration::from_secs(2), rx_a.recv())
        .await
        .expect("no broadcast arrived");
    match update {
        Some(ServerEvent::PriceUpdate(update)) => assert_eq!(update.price, dec!(50)),
        other => panic!("expected price update, got {:?}", other),
    }

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}
