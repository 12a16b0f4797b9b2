//! Audits command implementation

use crate::config::Config;
use crate::data::{HistoryQuery, ParquetHistory};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AuditsArgs {
    /// Only show entries for this user id
    #[arg(short, long)]
    pub user: Option<String>,

    /// Directory containing Parquet files (defaults to data.output_dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl AuditsArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let data_dir = self
            .data_dir
            .clone()
            .unwrap_or_else(|| config.data.output_dir.clone());

        let history = ParquetHistory::new(data_dir);
        let audits = history.subscription_audits(self.user.as_deref()).await?;

        if audits.is_empty() {
            println!("No subscription audits recorded");
            return Ok(());
        }

        println!("{:<30} {:<24} {:<12} {:<12}", "TIMESTAMP", "USER", "ACTION", "SYMBOL");
        for audit in audits {
            println!(
                "{:<30} {:<24} {:<12} {:<12}",
                audit.timestamp.to_rfc3339(),
                audit.user_id,
                audit.action,
                audit.symbol
            );
        }
        Ok(())
    }
}
