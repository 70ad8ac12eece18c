//! Observability module for orbital-cdn.
//!
//! Installs the global `tracing` subscriber. Library code only emits events;
//! the binary decides where they go.

use crate::config::ObservabilityConfig;
use crate::error::{OrbitalError, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            OrbitalError::invalid_config("observability.log_level", e.to_string())
        })?;

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| OrbitalError::Internal(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| OrbitalError::Internal(format!("Failed to init logging: {}", e)))?;
    }

    info!(level = %config.log_level, json = config.json_logs, "Observability initialized");
    Ok(())
}
