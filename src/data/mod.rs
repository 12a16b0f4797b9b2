//! Persistence collaborator
//!
//! The core only appends: every accepted tick and every subscription
//! change is handed to a [`TickStore`]. Nothing in the pipeline reads the
//! store back; history queries go through [`HistoryQuery`].

mod history;
mod memory;
mod parquet;
mod recorder;

pub use history::{
    clamp_tick_limit, ParquetHistory, DEFAULT_TICK_LIMIT, MAX_AUDIT_ROWS, MAX_TICK_LIMIT,
};
pub use memory::MemoryStore;
pub use self::parquet::{ParquetReader, ParquetRecord, ParquetWriter};
pub use recorder::{DataRecorder, RecorderConfig, RecorderStats};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One persisted price observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    pub symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Kind of subscription change being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Subscribe,
    Unsubscribe,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Subscribe => "Subscribe",
            AuditAction::Unsubscribe => "Unsubscribe",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Subscribe" => Ok(AuditAction::Subscribe),
            "Unsubscribe" => Ok(AuditAction::Unsubscribe),
            other => Err(StoreError::Corrupt(format!("unknown audit action {other:?}"))),
        }
    }
}

/// One persisted subscription audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub user_id: String,
    pub symbol: String,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
}

/// Persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Background writer is gone
    #[error("store is closed")]
    Closed,
    /// Underlying write failed
    #[error("write failed: {0}")]
    Write(String),
    /// Stored data could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Append-only sink for ticks and subscription audits
#[async_trait]
pub trait TickStore: Send + Sync {
    /// Record one accepted tick
    async fn record_tick(&self, tick: TickRecord) -> Result<(), StoreError>;
    /// Record one subscribe/unsubscribe action
    async fn record_subscription_audit(&self, audit: AuditRecord) -> Result<(), StoreError>;
}

/// Read-only history over persisted records
#[async_trait]
pub trait HistoryQuery: Send + Sync {
    /// Newest-first ticks for a symbol, at most [`MAX_TICK_LIMIT`]
    async fn recent_ticks(&self, symbol: &str, limit: usize) -> anyhow::Result<Vec<TickRecord>>;
    /// Newest-first audit entries, optionally for one user, at most [`MAX_AUDIT_ROWS`]
    async fn subscription_audits(&self, user_id: Option<&str>)
        -> anyhow::Result<Vec<AuditRecord>>;
}
