//! # Configuration Management
//!
//! Configuration is resolved once at startup into an immutable [`AppConfig`].
//! Anything malformed is a startup-fatal error; request handling never sees
//! configuration problems.

pub mod profiles;
pub mod settings;

pub use profiles::{Environment, ENVIRONMENT_VAR};
pub use settings::{
    AppConfig, AuthorityConfig, AwsConfig, ObservabilityConfig, ServerConfig, TenantConfig,
    ENV_PREFIX,
};
