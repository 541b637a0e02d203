//! Price feeder entry point.
//!
//! Aggregates live exchange quotes into USD consensus prices and keeps
//! a vote-ready snapshot fresh for the external chain client.

use anyhow::Result;
use clap::Parser;
use feeder_provider::ProviderRegistry;
use tracing::info;

/// Multi-provider price oracle feeder
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FEEDER_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    feeder_ws::init_crypto();

    let args = Args::parse();

    feeder_telemetry::init_logging()?;

    info!("Starting price feeder v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > FEEDER_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("FEEDER_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = feeder_bot::AppConfig::from_file(&config_path)?;

    // Exchange adapters register their constructors here; a configured
    // provider name with no registration fails before any network
    // activity.
    let registry = ProviderRegistry::new();

    let app = feeder_bot::Application::new(config, registry)?;

    let token = app.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            token.cancel();
        }
    });

    app.run().await?;

    Ok(())
}
