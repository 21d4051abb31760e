//! # Sensor Coordinator
//!
//! Entry point. Startup sequence:
//!
//! 1. Load configuration from the environment
//! 2. Initialise logging
//! 3. Validate configuration
//! 4. Run the coordinator until Ctrl+C

use anyhow::{Context, Result};
use coordinator_runtime::{init_logging, CoordinatorConfig, CoordinatorRuntime};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = CoordinatorConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialise logging")?;
    config.validate().context("Invalid configuration")?;

    let runtime = CoordinatorRuntime::new(config);
    let cancel = runtime.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!(error = %e, "Cannot listen for Ctrl+C; shutting down"),
        }
        cancel.cancel();
    });

    info!("Coordinator is running. Press Ctrl+C to stop.");
    let summary = runtime.run().await?;
    info!(
        sources = summary.metrics.sources_discovered,
        readings = summary.metrics.readings_published,
        "Goodbye"
    );
    Ok(())
}
