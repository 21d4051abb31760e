//! Logging bootstrap.
//!
//! One global `tracing` subscriber: an `EnvFilter` built from the configured
//! level plus either a JSON or a human-readable fmt layer.

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Logging already initialised: {0}")]
    AlreadyInitialised(String),
}

/// Parse the configured filter directive.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(config)?;

    if config.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialised(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialised(e.to_string()))?;
    }

    tracing::debug!(level = %config.level, json = config.json, "Logging initialised");
    Ok(())
}
