//! ThreatScan - Domain Threat-Intelligence Lookup Service
//!
//! Serves `GET /scan?domain=...`, which merges a reputation lookup and an
//! indicator lookup into one stored record.

use anyhow::Result;
use clap::Parser;
use threatscan::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn set_or_unset(value: Option<&str>) -> &'static str {
    if value.is_some() {
        "set"
    } else {
        "not set"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_tracing("info");
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);

    info!("ThreatScan starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_address);
    info!("CORS Any Origin: {}", config.server.allow_any_origin);
    info!("Database URL: {}", config.database.url);
    info!("Reputation Service: {}", config.reputation.base_url);
    info!("Reputation API Key: {}", set_or_unset(config.reputation.api_key()));
    info!("Indicator Service: {}", config.indicator.base_url);
    info!("Indicator API Key: {}", set_or_unset(config.indicator.api_key()));
    info!(
        "Upstream Timeouts: {}s / {}s",
        config.reputation.timeout_seconds, config.indicator.timeout_seconds
    );
    info!("Metrics: {}", if config.metrics.enabled { "Enabled" } else { "Disabled" });
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;
    let app_handle = tokio::spawn(app.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");
    let _ = shutdown_tx.send(true);

    match app_handle.await {
        Ok(result) => result?,
        Err(e) => error!("Application task panicked: {:?}", e),
    }

    info!("All tasks shut down. Exiting.");
    Ok(())
}
