//! # Configuration Settings
//!
//! Defines the configuration structure for the gatekeeper and how it is
//! assembled from built-in profiles, an optional file and the environment.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::profiles::Environment;
use crate::domain::{CaRegistry, CertificateAuthority, Tenant, TenantDirectory};
use crate::errors::{Error, Result};

/// Prefix of environment variables that override configuration values.
///
/// Nested keys are separated by `__`, e.g. `GATEKEEPER__SERVER__PORT=9000` or
/// `GATEKEEPER__TENANTS__EE__SECRET=...`. Keys are lower-cased by the loader.
pub const ENV_PREFIX: &str = "GATEKEEPER";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment; selects the built-in CA profile
    #[serde(skip)]
    pub environment: Environment,

    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// AWS region and endpoint configuration
    #[validate(nested)]
    pub aws: AwsConfig,

    /// Logging and metrics configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Private CAs keyed by the name used in request paths
    pub authorities: BTreeMap<String, AuthorityConfig>,

    /// Tenants keyed by basic-auth username
    pub tenants: BTreeMap<String, TenantConfig>,
}

impl AppConfig {
    /// Load configuration for the environment named by `NOTIFY_ENVIRONMENT`.
    ///
    /// Precedence, lowest first: defaults, built-in CA profile, config file,
    /// `GATEKEEPER__*` variables. `AWS_REGION` overrides the region last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let environment = Environment::from_env()?;
        Self::load_for(environment, path)
    }

    pub fn load_for(environment: Environment, path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"));

        let mut app: AppConfig = builder.build()?.try_deserialize()?;
        app.environment = environment;
        app.apply_profile();

        if let Ok(region) = std::env::var("AWS_REGION") {
            if !region.trim().is_empty() {
                app.aws.region = region;
            }
        }

        app.validate()?;
        Ok(app)
    }

    /// Fill in CAs from the environment's built-in profile without
    /// overriding anything configured explicitly.
    fn apply_profile(&mut self) {
        for (name, authority) in self.environment.builtin_authorities() {
            self.authorities.entry(name).or_insert(authority);
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        if self.authorities.is_empty() {
            return Err(Error::validation_field(
                "at least one certificate authority must be configured",
                "authorities",
            ));
        }
        if self.tenants.is_empty() {
            return Err(Error::validation_field("at least one tenant must be configured", "tenants"));
        }

        for (name, authority) in &self.authorities {
            authority.validate().map_err(|err| {
                Error::validation_field(Error::from(err).to_string(), format!("authorities.{}", name))
            })?;
        }
        for (id, tenant) in &self.tenants {
            tenant.validate().map_err(|err| {
                Error::validation_field(Error::from(err).to_string(), format!("tenants.{}", id))
            })?;
        }

        Ok(())
    }

    /// Build the immutable CA registry from the configured authorities.
    pub fn ca_registry(&self) -> Result<CaRegistry> {
        CaRegistry::new(
            self.aws.region.clone(),
            self.authorities.iter().map(|(name, authority)| {
                CertificateAuthority::new(
                    name.as_str(),
                    authority.ca_id.as_str(),
                    authority.account_id.as_str(),
                    authority.revocation_bucket.as_str(),
                )
            }),
        )
    }

    /// Build the immutable tenant directory. Secrets are hashed here.
    pub fn tenant_directory(&self) -> Result<TenantDirectory> {
        TenantDirectory::new(self.tenants.iter().map(|(id, tenant)| {
            Tenant::new(id.as_str(), &tenant.secret, tenant.allowed_common_names.iter().cloned())
        }))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Bind address cannot be empty"))]
    pub bind_address: String,

    /// Server port
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Maximum request body size in bytes; CSRs are small
    #[validate(range(min = 1024, message = "Max body size must be at least 1KB"))]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0".to_string(), port: 8080, max_body_size: 64 * 1024 }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// AWS configuration shared by the object store and CA provider clients
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct AwsConfig {
    #[validate(length(min = 1, message = "Region cannot be empty"))]
    pub region: String,

    /// Override for the S3 endpoint, e.g. a local emulator. Path-style
    /// addressing is used when set.
    #[validate(url(message = "S3 endpoint must be a valid URL"))]
    pub s3_endpoint: Option<String>,

    /// Override for the ACM Private CA endpoint
    #[validate(url(message = "ACM PCA endpoint must be a valid URL"))]
    pub acm_pca_endpoint: Option<String>,

    /// Per-call HTTP timeout for AWS requests in seconds
    #[validate(range(min = 1, max = 120, message = "Request timeout must be between 1 and 120 seconds"))]
    pub request_timeout_seconds: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "eu-west-2".to_string(),
            s3_endpoint: None,
            acm_pca_endpoint: None,
            request_timeout_seconds: 30,
        }
    }
}

impl AwsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing service name
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Prometheus exporter port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: crate::APP_NAME.to_string(),
            log_level: "info".to_string(),
            json_logging: false,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        self.metrics_port.filter(|port| *port != 0).map(|port| format!("0.0.0.0:{}", port))
    }
}

/// One private CA as configured
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct AuthorityConfig {
    /// CA identifier assigned by the provider
    #[validate(length(min = 1, message = "CA id cannot be empty"))]
    pub ca_id: String,

    /// Bucket holding the CA's revocation list
    #[validate(length(min = 1, message = "Revocation bucket cannot be empty"))]
    pub revocation_bucket: String,

    /// Account owning the CA
    #[validate(length(min = 1, message = "Account id cannot be empty"))]
    pub account_id: String,
}

/// One tenant as configured. The secret is wiped from memory on drop.
#[derive(Clone, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct TenantConfig {
    #[validate(length(min = 1, message = "Secret cannot be empty"))]
    pub secret: String,

    /// Accepts a list or a comma-separated string (for environment overrides)
    #[serde(default, deserialize_with = "deserialize_string_list")]
    #[zeroize(skip)]
    pub allowed_common_names: Vec<String>,
}

impl fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfig")
            .field("secret", &"[REDACTED]")
            .field("allowed_common_names", &self.allowed_common_names)
            .finish()
    }
}

fn deserialize_string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringList {
        List(Vec<String>),
        Joined(String),
    }

    let names = match StringList::deserialize(deserializer)? {
        StringList::List(names) => names,
        StringList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(names.into_iter().map(|name| name.trim().to_string()).filter(|name| !name.is_empty()).collect())
}
