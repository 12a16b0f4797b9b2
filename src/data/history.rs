//! Read-only history queries over persisted records

use super::parquet::{ParquetReader, ParquetRecord};
use super::{AuditRecord, HistoryQuery, TickRecord};
use crate::symbol::normalize_symbol;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Ticks returned when the caller does not ask for a specific count
pub const DEFAULT_TICK_LIMIT: usize = 50;
/// Hard cap on ticks returned by one query
pub const MAX_TICK_LIMIT: usize = 500;
/// Hard cap on audit rows returned by one query
pub const MAX_AUDIT_ROWS: usize = 200;

/// Clamp a requested tick count to [`MAX_TICK_LIMIT`]
pub fn clamp_tick_limit(limit: usize) -> usize {
    limit.min(MAX_TICK_LIMIT)
}

/// Newest-first ticks for one symbol
pub(crate) fn select_recent_ticks(
    ticks: impl IntoIterator<Item = TickRecord>,
    symbol: &str,
    limit: usize,
) -> Vec<TickRecord> {
    let symbol = normalize_symbol(symbol);
    let mut matching: Vec<TickRecord> = ticks.into_iter().filter(|t| t.symbol == symbol).collect();
    matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    matching.truncate(clamp_tick_limit(limit));
    matching
}

/// Newest-first audit rows, optionally for one user
pub(crate) fn select_audits(
    audits: impl IntoIterator<Item = AuditRecord>,
    user_id: Option<&str>,
) -> Vec<AuditRecord> {
    let mut matching: Vec<AuditRecord> = audits
        .into_iter()
        .filter(|a| user_id.map_or(true, |user| a.user_id == user))
        .collect();
    matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    matching.truncate(MAX_AUDIT_ROWS);
    matching
}

/// History over a directory of Parquet files written by the recorder
#[derive(Debug, Clone)]
pub struct ParquetHistory {
    data_dir: PathBuf,
}

impl ParquetHistory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load every record of kind `R` found in the data directory
    fn load_all<R: ParquetRecord>(data_dir: &Path) -> anyhow::Result<Vec<R>> {
        let mut records = Vec::new();
        if !data_dir.exists() {
            return Ok(records);
        }

        let prefix = format!("{}_", R::PREFIX);
        for entry in std::fs::read_dir(data_dir)? {
            let path = entry?.path();
            let is_match = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with(&prefix) && name.ends_with(".parquet"));

            if is_match {
                records.extend(ParquetReader::new(path).read::<R>()?);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl HistoryQuery for ParquetHistory {
    async fn recent_ticks(&self, symbol: &str, limit: usize) -> anyhow::Result<Vec<TickRecord>> {
        let dir = self.data_dir.clone();
        let ticks = tokio::task::spawn_blocking(move || Self::load_all::<TickRecord>(&dir)).await??;
        Ok(select_recent_ticks(ticks, symbol, limit))
    }

    async fn subscription_audits(
        &self,
        user_id: Option<&str>,
    ) -> anyhow::Result<Vec<AuditRecord>> {
        let dir = self.data_dir.clone();
        let audits =
            tokio::task::spawn_blocking(move || Self::load_all::<AuditRecord>(&dir)).await??;
        Ok(select_audits(audits, user_id))
    }
}
