//! Prometheus metrics

use std::time::Duration;

/// Monotonic counters
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Ticks written to the cache
    TicksAccepted,
    /// Watchlisted records with non-numeric fields
    RecordsRejected,
    /// Feed messages that were not a ticker batch
    BatchDecodeErrors,
    /// Upstream reconnect attempts
    FeedReconnects,
    /// Tick persistence failures
    StoreErrors,
    /// Subscription audit persistence failures
    AuditErrors,
    /// Group deliveries that reached every member
    BroadcastsDelivered,
    /// Group deliveries with at least one unreachable member
    BroadcastFailures,
}

/// Point-in-time gauges
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Symbols currently cached
    CachedSymbols,
    /// Open client connections
    ConnectedClients,
    /// 1 while the upstream feed is streaming
    FeedConnected,
}

/// Latency histograms
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// One full broadcast cycle
    BroadcastCycle,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::TicksAccepted => "relay_ticks_accepted_total",
            CounterMetric::RecordsRejected => "relay_records_rejected_total",
            CounterMetric::BatchDecodeErrors => "relay_batch_decode_errors_total",
            CounterMetric::FeedReconnects => "relay_feed_reconnects_total",
            CounterMetric::StoreErrors => "relay_store_errors_total",
            CounterMetric::AuditErrors => "relay_audit_errors_total",
            CounterMetric::BroadcastsDelivered => "relay_broadcasts_delivered_total",
            CounterMetric::BroadcastFailures => "relay_broadcast_failures_total",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::CachedSymbols => "relay_cached_symbols",
            GaugeMetric::ConnectedClients => "relay_connected_clients",
            GaugeMetric::FeedConnected => "relay_feed_connected",
        }
    }
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    increment_by(metric, 1);
}

/// Increment a counter
pub fn increment_by(metric: CounterMetric, value: u64) {
    metrics::counter!(metric.name()).increment(value);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::BroadcastCycle => "relay_broadcast_cycle_ms",
    };

    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_recorder_are_noops() {
        increment(CounterMetric::TicksAccepted);
        set_gauge(GaugeMetric::ConnectedClients, 3.0);
        record_latency(LatencyMetric::BroadcastCycle, Duration::from_millis(2));
    }

    #[test]
    fn test_counter_names_are_prefixed() {
        assert!(CounterMetric::FeedReconnects.name().starts_with("relay_"));
        assert!(GaugeMetric::FeedConnected.name().starts_with("relay_"));
    }
}
