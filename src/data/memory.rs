//! In-memory store

use super::history::{select_audits, select_recent_ticks};
use super::{AuditRecord, HistoryQuery, StoreError, TickRecord, TickStore};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Append-only store kept in process memory.
///
/// Used when capture to disk is disabled, and as a test double. A bounded
/// store forgets its oldest records once it holds `max_records` of a kind.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ticks: RwLock<VecDeque<TickRecord>>,
    audits: RwLock<VecDeque<AuditRecord>>,
    max_records: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(max_records: usize) -> Self {
        Self {
            max_records: Some(max_records.max(1)),
            ..Self::default()
        }
    }

    /// Every retained tick in arrival order
    pub async fn ticks(&self) -> Vec<TickRecord> {
        self.ticks.read().await.iter().cloned().collect()
    }

    /// Every retained audit entry in arrival order
    pub async fn audits(&self) -> Vec<AuditRecord> {
        self.audits.read().await.iter().cloned().collect()
    }

    fn append<R>(&self, records: &mut VecDeque<R>, record: R) {
        records.push_back(record);
        if let Some(max) = self.max_records {
            while records.len() > max {
                records.pop_front();
            }
        }
    }
}

#[async_trait]
impl TickStore for MemoryStore {
    async fn record_tick(&self, tick: TickRecord) -> Result<(), StoreError> {
        self.append(&mut *self.ticks.write().await, tick);
        Ok(())
    }

    async fn record_subscription_audit(&self, audit: AuditRecord) -> Result<(), StoreError> {
        self.append(&mut *self.audits.write().await, audit);
        Ok(())
    }
}

#[async_trait]
impl HistoryQuery for MemoryStore {
    async fn recent_ticks(&self, symbol: &str, limit: usize) -> anyhow::Result<Vec<TickRecord>> {
        Ok(select_recent_ticks(self.ticks().await, symbol, limit))
    }

    async fn subscription_audits(
        &self,
        user_id: Option<&str>,
    ) -> anyhow::Result<Vec<AuditRecord>> {
        Ok(select_audits(self.audits().await, user_id))
    }
}
