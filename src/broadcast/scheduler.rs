//! Broadcast loop

use super::{GroupSink, PriceUpdate};
use crate::cache::PriceCache;
use crate::registry::SubscriptionRegistry;
use crate::telemetry::{increment, increment_by, record_latency, CounterMetric, LatencyMetric};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Default broadcast cadence
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome of one broadcast cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Groups that received their update
    pub delivered: usize,
    /// Groups whose delivery failed
    pub failed: usize,
    /// Cached symbols with nobody listening
    pub skipped: usize,
}

impl CycleReport {
    /// Events emitted this cycle, successful or not
    pub fn events(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Reads the cache on a fixed timer and pushes to subscribed groups.
///
/// The timer is independent of the feed: many ticks between two cycles
/// collapse into one update per symbol.
pub struct BroadcastScheduler {
    cache: Arc<PriceCache>,
    registry: Arc<SubscriptionRegistry>,
    sink: Arc<dyn GroupSink>,
    interval: Duration,
}

impl BroadcastScheduler {
    pub fn new(
        cache: Arc<PriceCache>,
        registry: Arc<SubscriptionRegistry>,
        sink: Arc<dyn GroupSink>,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            registry,
            sink,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Broadcast every interval until `shutdown` flips to true.
    ///
    /// A cycle that has started always runs to completion before the
    /// shutdown signal is observed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Broadcast scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        // Late cycles are dropped, never replayed in a burst
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let report = self.broadcast_cycle().await;
                    if report.events() > 0 {
                        tracing::trace!(
                            delivered = report.delivered,
                            failed = report.failed,
                            skipped = report.skipped,
                            "Broadcast cycle complete"
                        );
                    }
                }
            }
        }

        tracing::info!("Broadcast scheduler stopped");
    }

    /// Run one broadcast cycle
    pub async fn broadcast_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let snapshots = self.cache.snapshot_all();
        if snapshots.is_empty() {
            return report;
        }

        let started = Instant::now();
        let broadcast_at = Utc::now();

        for snapshot in snapshots {
            let members = self.registry.members_of(&snapshot.symbol);
            if members.is_empty() {
                report.skipped += 1;
                continue;
            }

            let update = PriceUpdate::from_snapshot(snapshot, broadcast_at);
            match self.sink.deliver(&members, &update).await {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::debug!(
                        symbol = %update.symbol,
                        price = %update.price,
                        members = members.len(),
                        "Broadcast to group"
                    );
                }
                Err(e) => {
                    // One bad group never blocks the rest of the cycle
                    report.failed += 1;
                    increment(CounterMetric::BroadcastFailures);
                    tracing::warn!(symbol = %update.symbol, error = %e, "Broadcast delivery failed");
                }
            }
        }

        if report.delivered > 0 {
            increment_by(CounterMetric::BroadcastsDelivered, report.delivered as u64);
        }
        record_latency(LatencyMetric::BroadcastCycle, started.elapsed());

        report
    }
}
