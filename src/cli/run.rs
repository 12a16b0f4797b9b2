//! Run command implementation

use crate::broadcast::BroadcastScheduler;
use crate::cache::PriceCache;
use crate::config::Config;
use crate::data::{DataRecorder, MemoryStore, TickStore};
use crate::feed::{StreamIngestor, Watchlist};
use crate::hub::Hub;
use crate::identity::{IdentityProvider, StaticTokenIdentity};
use crate::registry::SubscriptionRegistry;
use crate::server::RelayServer;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Records retained per kind when capture is disabled
const IN_MEMORY_RETENTION: usize = 100_000;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override server.bind_addr
    #[arg(long)]
    pub bind: Option<String>,

    /// Keep ticks and audits in memory instead of writing Parquet
    #[arg(long)]
    pub no_capture: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let cache = Arc::new(PriceCache::new());
        let registry = Arc::new(SubscriptionRegistry::new());

        let recorder = if config.data.capture_enabled && !self.no_capture {
            tracing::info!(output_dir = ?config.data.output_dir, "Recording to Parquet");
            Some(Arc::new(DataRecorder::new(
                config.data.recorder_config(),
                shutdown_rx.clone(),
            )))
        } else {
            tracing::info!("Capture disabled, keeping records in memory");
            None
        };
        let store: Arc<dyn TickStore> = match &recorder {
            Some(recorder) => recorder.clone(),
            None => Arc::new(MemoryStore::bounded(IN_MEMORY_RETENTION)),
        };

        let hub = Arc::new(Hub::new(
            registry.clone(),
            store.clone(),
            config.server.client_queue,
        ));
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(StaticTokenIdentity::new(config.server.tokens.clone()));

        let bind_addr = self.bind.as_deref().unwrap_or(&config.server.bind_addr);
        let server = RelayServer::bind(bind_addr, hub.clone(), identity).await?;

        let ingestor = StreamIngestor::new(
            config.feed.ws_config(),
            cache.clone(),
            Watchlist::new(&config.feed.watchlist),
            store,
        );
        let scheduler = BroadcastScheduler::new(cache, registry, hub, config.broadcast.interval());

        let ingest_task = tokio::spawn({
            let shutdown = shutdown_rx.clone();
            async move { ingestor.run(shutdown).await }
        });
        let broadcast_task = tokio::spawn({
            let shutdown = shutdown_rx.clone();
            async move { scheduler.run(shutdown).await }
        });
        let server_task = tokio::spawn(server.run(shutdown_rx));

        tracing::info!(bind_addr, "crypto-relay running, press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown requested");

        shutdown_tx.send_replace(true);
        for (name, task) in [
            ("ingestor", ingest_task),
            ("broadcaster", broadcast_task),
            ("server", server_task),
        ] {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = %e, "Task panicked");
            }
        }

        if let Some(recorder) = recorder {
            recorder.join().await;
            let stats = recorder.stats().await;
            tracing::info!(
                ticks_written = stats.ticks_written,
                audits_written = stats.audits_written,
                files_written = stats.files_written,
                write_errors = stats.write_errors,
                "Recorder flushed"
            );
        }

        Ok(())
    }
}
