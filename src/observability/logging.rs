//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` wins over the
//! configured level so operators can raise verbosity without a config change.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{Error, Result};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json_logging {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::config(format!("Failed to install log subscriber: {}", e)))
}

/// Log configuration at startup. Tenant secrets are never included.
pub fn log_config_info(config: &AppConfig) {
    let authorities: Vec<&str> = config.authorities.keys().map(String::as_str).collect();
    let tenants: Vec<&str> = config.tenants.keys().map(String::as_str).collect();

    tracing::info!(
        environment = %config.environment,
        server_address = %config.server.socket_address(),
        region = %config.aws.region,
        authorities = ?authorities,
        tenants = ?tenants,
        metrics_enabled = config.observability.metrics_bind_address().is_some(),
        "Gatekeeper configuration"
    );
}
