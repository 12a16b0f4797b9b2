//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use self::metrics::{
    increment, increment_by, record_latency, set_gauge, CounterMetric, GaugeMetric, LatencyMetric,
};
pub use logging::{init_logging, LogFormat};

use crate::config::TelemetryConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize all telemetry subsystems
///
/// Must be called from inside the tokio runtime when a metrics port is
/// configured, since the exporter serves HTTP on a runtime task.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)?;

    if config.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    Ok(())
}
