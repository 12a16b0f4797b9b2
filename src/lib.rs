//! crypto-relay: real-time crypto price relay
//!
//! This library provides the core components for:
//! - Ingesting the Binance mini-ticker stream with automatic reconnection
//! - A latest-value price cache per watched symbol
//! - Per-symbol subscription groups for connected consumers
//! - A fixed-cadence broadcaster that coalesces ticks between cycles
//! - Tick and subscription-audit capture to Parquet, with history queries
//! - Structured logging and Prometheus metrics

pub mod broadcast;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod feed;
pub mod hub;
pub mod identity;
pub mod registry;
pub mod server;
pub mod symbol;
pub mod telemetry;
pub mod ws;
