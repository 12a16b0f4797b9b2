//! Ticks command implementation

use crate::config::Config;
use crate::data::{HistoryQuery, ParquetHistory, DEFAULT_TICK_LIMIT};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TicksArgs {
    /// Symbol to query (case-insensitive)
    pub symbol: String,

    /// Maximum ticks to show, newest first (capped at 500)
    #[arg(short, long, default_value_t = DEFAULT_TICK_LIMIT)]
    pub limit: usize,

    /// Directory containing Parquet files (defaults to data.output_dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl TicksArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let data_dir = self
            .data_dir
            .clone()
            .unwrap_or_else(|| config.data.output_dir.clone());
        tracing::debug!(symbol = %self.symbol, data_dir = ?data_dir, "Querying ticks");

        let history = ParquetHistory::new(data_dir);
        let ticks = history.recent_ticks(&self.symbol, self.limit).await?;

        if ticks.is_empty() {
            println!("No ticks recorded for {}", self.symbol.to_uppercase());
            return Ok(());
        }

        println!("{:<30} {:<12} {:>20} {:>20}", "TIMESTAMP", "SYMBOL", "PRICE", "VOLUME");
        for tick in ticks {
            println!(
                "{:<30} {:<12} {:>20} {:>20}",
                tick.timestamp.to_rfc3339(),
                tick.symbol,
                tick.price,
                tick.volume
            );
        }
        Ok(())
    }
}
