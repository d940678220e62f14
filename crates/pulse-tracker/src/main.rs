//! pulse tracker entry point.
//!
//! Streams the all-market ticker feed and keeps the latest price, change
//! and short history for the configured symbols.

use anyhow::Result;
use clap::Parser;
use pulse_tracker::config::{AppConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use std::path::Path;
use tracing::{info, warn};

/// Live crypto ticker tracker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PULSE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Default log filter, overrides the config file (RUST_LOG still wins)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any WS connection
    pulse_ws::init_crypto();

    let args = Args::parse();

    // Determine config path: CLI arg > PULSE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config_found = Path::new(&config_path).exists();
    let config = AppConfig::load_from(&config_path)?;

    let log_level = args
        .log_level
        .unwrap_or_else(|| config.telemetry.log_level.clone());
    pulse_telemetry::init_logging(&log_level)?;

    info!("Starting pulse tracker v{}", env!("CARGO_PKG_VERSION"));
    if config_found {
        info!(config_path = %config_path, "Configuration loaded");
    } else {
        warn!(config_path = %config_path, "Config file not found, using defaults");
    }

    let app = pulse_tracker::Application::new(config)?;
    app.run().await?;

    Ok(())
}
