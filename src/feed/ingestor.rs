//! Stream ingestor: feed -> watchlist filter -> cache -> tick store

use super::{decode_batch, IngestError, RecordOutcome, TickerRecord, Watchlist};
use crate::cache::{PriceCache, Snapshot};
use crate::data::{TickRecord, TickStore};
use crate::symbol::normalize_symbol;
use crate::telemetry::{increment, set_gauge, CounterMetric, GaugeMetric};
use crate::ws::{ConnectionState, WsClient, WsConfig, WsMessage};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// Per-message tally of record outcomes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub accepted: usize,
    pub not_watched: usize,
    pub invalid_number: usize,
    pub malformed: usize,
}

impl BatchSummary {
    fn add(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Accepted => self.accepted += 1,
            RecordOutcome::NotWatched => self.not_watched += 1,
            RecordOutcome::InvalidNumber => self.invalid_number += 1,
            RecordOutcome::Malformed => self.malformed += 1,
        }
    }
}

/// Sole writer of the price cache.
///
/// Owns the upstream connection; never waits on the broadcaster.
pub struct StreamIngestor {
    client: WsClient,
    cache: Arc<PriceCache>,
    watchlist: Watchlist,
    store: Arc<dyn TickStore>,
}

impl StreamIngestor {
    pub fn new(
        config: WsConfig,
        cache: Arc<PriceCache>,
        watchlist: Watchlist,
        store: Arc<dyn TickStore>,
    ) -> Self {
        Self {
            client: WsClient::new(config),
            cache,
            watchlist,
            store,
        }
    }

    /// Watch the upstream connection state
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.client.state()
    }

    /// Ingest until `shutdown` flips to true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            url = %self.client.url(),
            watchlist = ?self.watchlist.symbols(),
            "Stream ingestor started"
        );

        let mut ws_rx = self.client.connect(shutdown.clone());

        loop {
            tokio::select! {
                msg = ws_rx.recv() => {
                    match msg {
                        Some(msg) => self.handle_ws_message(msg).await,
                        None => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("Stream ingestor stopped");
    }

    async fn handle_ws_message(&self, msg: WsMessage) {
        match msg {
            WsMessage::Text(text) => {
                // A bad batch is a data error, the connection stays up
                if let Err(e) = self.process_message(&text).await {
                    increment(CounterMetric::BatchDecodeErrors);
                    tracing::warn!(error = %e, "Failed to process feed message");
                }
            }
            WsMessage::Connected => {
                set_gauge(GaugeMetric::FeedConnected, 1.0);
                tracing::info!("Price feed connected");
            }
            WsMessage::Disconnected => {
                set_gauge(GaugeMetric::FeedConnected, 0.0);
                tracing::warn!("Price feed disconnected");
            }
            WsMessage::Reconnecting { attempt } => {
                increment(CounterMetric::FeedReconnects);
                tracing::warn!(attempt, "Price feed reconnecting...");
            }
            WsMessage::Binary(_) => {
                // The ticker stream is text-only
            }
        }
    }

    /// Process one feed message (a batch of ticker records)
    pub async fn process_message(&self, msg: &str) -> Result<BatchSummary, IngestError> {
        let mut summary = BatchSummary::default();

        for decoded in decode_batch(msg)? {
            let outcome = match decoded {
                Ok(record) => self.accept_record(record).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed ticker record");
                    RecordOutcome::Malformed
                }
            };
            summary.add(outcome);
        }

        if summary.accepted > 0 {
            set_gauge(GaugeMetric::CachedSymbols, self.cache.len() as f64);
        }
        Ok(summary)
    }

    /// Filter, parse, cache and persist one record
    async fn accept_record(&self, record: TickerRecord) -> RecordOutcome {
        let symbol = normalize_symbol(&record.symbol);
        if !self.watchlist.contains(&symbol) {
            return RecordOutcome::NotWatched;
        }

        let (price, volume) = match (
            Decimal::from_str(&record.price),
            Decimal::from_str(&record.volume),
        ) {
            (Ok(price), Ok(volume)) => (price, volume),
            _ => {
                increment(CounterMetric::RecordsRejected);
                tracing::debug!(
                    symbol = %symbol,
                    price = %record.price,
                    volume = %record.volume,
                    "Discarding ticker with non-numeric fields"
                );
                return RecordOutcome::InvalidNumber;
            }
        };

        let snapshot = Snapshot::now(symbol, price, volume);
        let tick = TickRecord {
            symbol: snapshot.symbol.clone(),
            price,
            volume,
            timestamp: snapshot.observed_at,
        };

        self.cache.set(snapshot);
        increment(CounterMetric::TicksAccepted);

        // The cache update stands even if persistence fails
        if let Err(e) = self.store.record_tick(tick).await {
            increment(CounterMetric::StoreErrors);
            tracing::error!(error = %e, "Failed to persist tick");
        }

        RecordOutcome::Accepted
    }
}
