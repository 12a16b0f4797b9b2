//! CLI interface for crypto-relay
//!
//! Provides subcommands for:
//! - `run`: Start the relay (feed, broadcaster, client server)
//! - `ticks`: Query recorded ticks for a symbol
//! - `audits`: Query the subscription audit log
//! - `config`: Show the effective configuration

mod audits;
mod run;
mod ticks;

pub use audits::AuditsArgs;
pub use run::RunArgs;
pub use ticks::TicksArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "crypto-relay")]
#[command(about = "Real-time crypto price relay with per-symbol subscriptions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the relay
    Run(RunArgs),
    /// Show recent ticks for a symbol
    Ticks(TicksArgs),
    /// Show subscription audit entries
    Audits(AuditsArgs),
    /// Show configuration
    Config,
}
