//! Configuration types for crypto-relay

use crate::broadcast::DEFAULT_BROADCAST_INTERVAL;
use crate::data::RecorderConfig;
use crate::feed::{BINANCE_MINI_TICKER_URL, DEFAULT_WATCHLIST};
use crate::hub::DEFAULT_CLIENT_QUEUE;
use crate::telemetry::LogFormat;
use crate::ws::WsConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Upstream price feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Symbols admitted to the cache
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,

    /// Fixed delay between reconnect attempts
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Give up on a connect or upgrade that takes longer than this
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_feed_url() -> String {
    BINANCE_MINI_TICKER_URL.to_string()
}
fn default_watchlist() -> Vec<String> {
    DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect()
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_ping_interval_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            watchlist: default_watchlist(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl FeedConfig {
    pub fn ws_config(&self) -> WsConfig {
        WsConfig::new(self.url.clone())
            .reconnect_delay(Duration::from_secs(self.reconnect_delay_secs))
            .ping_interval(Duration::from_secs(self.ping_interval_secs.max(1)))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs.max(1)))
    }
}

/// Broadcast scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    DEFAULT_BROADCAST_INTERVAL.as_millis() as u64
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl BroadcastConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Consumer-facing server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Outbound queue depth per client
    #[serde(default = "default_client_queue")]
    pub client_queue: usize,

    /// Bearer token -> user id
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_client_queue() -> usize {
    DEFAULT_CLIENT_QUEUE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            client_queue: default_client_queue(),
            tokens: HashMap::new(),
        }
    }
}

/// Data capture configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Persist to Parquet; otherwise records stay in memory
    #[serde(default = "default_true")]
    pub capture_enabled: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_buffer_size() -> usize {
    1000
}
fn default_flush_interval_secs() -> u64 {
    60
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            capture_enabled: true,
            output_dir: default_output_dir(),
            buffer_size: default_buffer_size(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

impl DataConfig {
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            output_dir: self.output_dir.clone(),
            buffer_size: self.buffer_size.max(1),
            flush_interval_secs: self.flush_interval_secs,
            ..RecorderConfig::default()
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus exporter port; 0 disables it
    #[serde(default)]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: 0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
