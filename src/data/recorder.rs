//! Buffered Parquet recorder for ticks and subscription audits

use super::parquet::{ParquetRecord, ParquetWriter};
use super::{AuditRecord, StoreError, TickRecord, TickStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Configuration for data recording
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Output directory for Parquet files
    pub output_dir: PathBuf,
    /// Buffer size before flushing
    pub buffer_size: usize,
    /// Maximum time between flushes
    pub flush_interval_secs: u64,
    /// Capacity of the in-flight queue per record kind
    pub queue_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            buffer_size: 1000,
            flush_interval_secs: 60,
            queue_capacity: 10_000,
        }
    }
}

/// Recording statistics
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    pub ticks_received: u64,
    pub ticks_written: u64,
    pub audits_received: u64,
    pub audits_written: u64,
    pub files_written: u64,
    pub write_errors: u64,
    pub last_flush: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
enum RecordKind {
    Tick,
    Audit,
}

impl RecordKind {
    fn mark_received(self, stats: &mut RecorderStats) {
        match self {
            RecordKind::Tick => stats.ticks_received += 1,
            RecordKind::Audit => stats.audits_received += 1,
        }
    }

    fn mark_written(self, stats: &mut RecorderStats, count: u64) {
        match self {
            RecordKind::Tick => stats.ticks_written += count,
            RecordKind::Audit => stats.audits_written += count,
        }
    }
}

/// Persists ticks and audits to Parquet files from background writer tasks.
///
/// Callers never wait on disk I/O: records are queued and the writers
/// flush when the buffer fills, on a timer, and once more on shutdown.
pub struct DataRecorder {
    config: RecorderConfig,
    tick_tx: mpsc::Sender<TickRecord>,
    audit_tx: mpsc::Sender<AuditRecord>,
    stats: Arc<RwLock<RecorderStats>>,
    writers: Mutex<Vec<JoinHandle<()>>>,
}

impl DataRecorder {
    /// Create a new data recorder and spawn its writer tasks
    pub fn new(config: RecorderConfig, shutdown: watch::Receiver<bool>) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel(config.queue_capacity);
        let (audit_tx, audit_rx) = mpsc::channel(config.queue_capacity);
        let stats = Arc::new(RwLock::new(RecorderStats::default()));

        let tick_writer = tokio::spawn(Self::run_writer(
            tick_rx,
            ParquetWriter::new(config.output_dir.clone()),
            config.clone(),
            stats.clone(),
            shutdown.clone(),
            RecordKind::Tick,
        ));

        let audit_writer = tokio::spawn(Self::run_writer(
            audit_rx,
            ParquetWriter::new(config.output_dir.clone()),
            config.clone(),
            stats.clone(),
            shutdown,
            RecordKind::Audit,
        ));

        Self {
            config,
            tick_tx,
            audit_tx,
            stats,
            writers: Mutex::new(vec![tick_writer, audit_writer]),
        }
    }

    /// Run one writer task until shutdown
    async fn run_writer<R: ParquetRecord>(
        mut rx: mpsc::Receiver<R>,
        mut writer: ParquetWriter,
        config: RecorderConfig,
        stats: Arc<RwLock<RecorderStats>>,
        mut shutdown: watch::Receiver<bool>,
        kind: RecordKind,
    ) {
        let mut buffer: Vec<R> = Vec::with_capacity(config.buffer_size);
        let mut flush_timer =
            tokio::time::interval(Duration::from_secs(config.flush_interval_secs.max(1)));
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Some(record) => {
                            kind.mark_received(&mut *stats.write().await);
                            buffer.push(record);

                            if buffer.len() >= config.buffer_size {
                                Self::flush(&mut buffer, &mut writer, &stats, kind).await;
                            }
                        }
                        None => break,
                    }
                }

                _ = flush_timer.tick() => {
                    Self::flush(&mut buffer, &mut writer, &stats, kind).await;
                }

                _ = shutdown.changed() => {
                    // Take whatever is already queued, then stop
                    while let Ok(record) = rx.try_recv() {
                        kind.mark_received(&mut *stats.write().await);
                        buffer.push(record);
                    }
                    break;
                }
            }
        }

        Self::flush(&mut buffer, &mut writer, &stats, kind).await;
        tracing::info!(kind = R::PREFIX, "Recorder writer shutting down");
    }

    /// Flush a buffer to a new Parquet file
    async fn flush<R: ParquetRecord>(
        buffer: &mut Vec<R>,
        writer: &mut ParquetWriter,
        stats: &Arc<RwLock<RecorderStats>>,
        kind: RecordKind,
    ) {
        if buffer.is_empty() {
            return;
        }

        let now = Utc::now();
        let path = writer.next_path(R::PREFIX, now);
        let count = buffer.len();

        // Encoding and file I/O stay off the async workers
        let records = std::mem::replace(buffer, Vec::with_capacity(count));
        let file_writer = writer.clone();
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || file_writer.write(&target, &records))
            .await
            .unwrap_or_else(|e| Err(anyhow::anyhow!("writer task failed: {}", e)));

        match result {
            Ok(()) => {
                let mut s = stats.write().await;
                kind.mark_written(&mut s, count as u64);
                s.files_written += 1;
                s.last_flush = Some(now);
                tracing::debug!(count, path = ?path, kind = R::PREFIX, "Flushed records");
            }
            Err(e) => {
                stats.write().await.write_errors += 1;
                tracing::error!(error = %e, kind = R::PREFIX, dropped = count, "Failed to write records");
            }
        }
    }

    fn enqueue<R>(tx: &mpsc::Sender<R>, record: R) -> Result<(), StoreError> {
        tx.try_send(record).map_err(|e| match e {
            TrySendError::Full(_) => StoreError::Write("recorder queue full".into()),
            TrySendError::Closed(_) => StoreError::Closed,
        })
    }

    /// Wait for both writer tasks to finish their final flush
    pub async fn join(&self) {
        let handles: Vec<JoinHandle<()>> = self.writers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Recorder writer task panicked");
            }
        }
    }

    /// Get output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.config.output_dir
    }

    /// Get current statistics
    pub async fn stats(&self) -> RecorderStats {
        self.stats.read().await.clone()
    }
}

#[async_trait]
impl TickStore for DataRecorder {
    async fn record_tick(&self, tick: TickRecord) -> Result<(), StoreError> {
        Self::enqueue(&self.tick_tx, tick)
    }

    async fn record_subscription_audit(&self, audit: AuditRecord) -> Result<(), StoreError> {
        Self::enqueue(&self.audit_tx, audit)
    }
}
