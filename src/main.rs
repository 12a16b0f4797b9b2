use clap::Parser;
use crypto_relay::cli::{Cli, Commands};
use crypto_relay::config::Config;

const DEFAULT_CONFIG: &str = include_str!("../config.toml.example");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(DEFAULT_CONFIG)?
        }
    };

    // Initialize telemetry
    crypto_relay::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting crypto-relay");
            args.execute(&config).await?;
        }
        Commands::Ticks(args) => {
            args.execute(&config).await?;
        }
        Commands::Audits(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Feed: {}", config.feed.url);
            println!("  Watchlist: {}", config.feed.watchlist.join(", "));
            println!(
                "  Reconnect delay: {}s, ping every {}s",
                config.feed.reconnect_delay_secs, config.feed.ping_interval_secs
            );
            println!("  Broadcast interval: {}ms", config.broadcast.interval_ms);
            println!(
                "  Server: {} (queue {}, {} tokens)",
                config.server.bind_addr,
                config.server.client_queue,
                config.server.tokens.len()
            );
            println!(
                "  Capture: {} -> {:?}",
                config.data.capture_enabled, config.data.output_dir
            );
            println!(
                "  Telemetry: log={} format={:?} metrics_port={}",
                config.telemetry.log_level, config.telemetry.log_format, config.telemetry.metrics_port
            );
        }
    }

    Ok(())
}
