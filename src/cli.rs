//! # Command Line Interface
//!
//! Flags override the loaded configuration; `check-config` validates it and
//! prints a summary without starting the server.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::errors::Result;

#[derive(Debug, Parser)]
#[command(name = "pca-gatekeeper")]
#[command(about = "Tenant-scoped gateway to private certificate authorities")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Log level or filter directive, e.g. `debug` or `pca_gatekeeper=trace`
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Validate configuration and print a summary without secrets
    CheckConfig,
}

impl Cli {
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }

    /// Apply flag overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(bind_address) = &self.bind_address {
            config.server.bind_address = bind_address.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.json_logs {
            config.observability.json_logging = true;
        }
        if let Some(log_level) = &self.log_level {
            config.observability.log_level = log_level.clone();
        }
    }
}

/// Human-readable summary of a validated configuration. Never includes
/// tenant secrets.
pub fn config_summary(config: &AppConfig) -> Result<String> {
    let registry = config.ca_registry()?;
    let mut summary = String::new();

    let _ = writeln!(summary, "environment: {}", config.environment);
    let _ = writeln!(summary, "listen: {}", config.server.socket_address());
    let _ = writeln!(summary, "region: {}", registry.region());
    let _ = writeln!(summary, "authorities:");
    for name in registry.names() {
        if let Some(authority) = registry.get(name.as_str()) {
            let _ = writeln!(
                summary,
                "  {} -> {} (crl: s3://{}/{})",
                name,
                registry.authority_ref(authority),
                authority.revocation_bucket(),
                authority.crl_object_key()
            );
        }
    }
    let _ = writeln!(summary, "tenants:");
    for (tenant_id, tenant) in &config.tenants {
        let _ = writeln!(
            summary,
            "  {}: {} allowed common name(s)",
            tenant_id,
            tenant.allowed_common_names.len()
        );
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthorityConfig, TenantConfig};

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["pca-gatekeeper"]);
        assert_eq!(cli.command(), &Commands::Serve);

        let cli = Cli::parse_from(["pca-gatekeeper", "check-config"]);
        assert_eq!(cli.command(), &Commands::CheckConfig);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "pca-gatekeeper",
            "--bind-address",
            "127.0.0.1",
            "--port",
            "9443",
            "--json-logs",
            "--log-level",
            "debug",
        ]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.socket_address(), "127.0.0.1:9443");
        assert!(config.observability.json_logging);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_summary_omits_secrets() {
        let mut config = AppConfig::default();
        config.authorities.insert(
            "vpn".to_string(),
            AuthorityConfig {
                ca_id: "1".to_string(),
                revocation_bucket: "vpn-revocations".to_string(),
                account_id: "1234".to_string(),
            },
        );
        config.tenants.insert(
            "ee".to_string(),
            TenantConfig {
                secret: "ee_password".to_string(),
                allowed_common_names: vec!["ee.tls.test.notify".to_string()],
            },
        );

        let summary = config_summary(&config).unwrap();
        assert!(summary.contains("vpn -> arn:aws:acm-pca:eu-west-2:1234:certificate-authority/1"));
        assert!(summary.contains("crl: s3://vpn-revocations/crl/1.crl"));
        assert!(summary.contains("ee: 1 allowed common name(s)"));
        assert!(!summary.contains("ee_password"));
    }
}
