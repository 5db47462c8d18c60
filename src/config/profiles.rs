//! Deployment environments and their built-in certificate authorities.

use std::fmt;
use std::str::FromStr;

use super::settings::AuthorityConfig;
use crate::errors::{Error, Result};

/// Environment variable naming the deployment environment.
pub const ENVIRONMENT_VAR: &str = "NOTIFY_ENVIRONMENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Read [`ENVIRONMENT_VAR`]; unset means development.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// CAs known for this environment. Development uses the staging CAs;
    /// production CAs must come from the config file or environment.
    pub fn builtin_authorities(&self) -> Vec<(String, AuthorityConfig)> {
        match self {
            Environment::Development | Environment::Staging => vec![
                (
                    "vpn".to_string(),
                    AuthorityConfig {
                        ca_id: "fb0bf875-66a5-4447-bae3-403c457bda2d".to_string(),
                        revocation_bucket: "gds-cb-vjv982-vpn-ca-revoc".to_string(),
                        account_id: "144489291306".to_string(),
                    },
                ),
                (
                    "tls".to_string(),
                    AuthorityConfig {
                        ca_id: "89a1067f-8bc0-48b3-8e85-bab92785c6a0".to_string(),
                        revocation_bucket: "gds-cb-jysgde-tls-ca-revoc".to_string(),
                        account_id: "144489291306".to_string(),
                    },
                ),
            ],
            Environment::Production => Vec::new(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(Error::config(format!(
                "Unknown {} '{}': expected development, staging or production",
                ENVIRONMENT_VAR, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment() {
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("Production".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_development_reuses_staging_authorities() {
        assert_eq!(
            Environment::Development.builtin_authorities(),
            Environment::Staging.builtin_authorities()
        );
    }

    #[test]
    fn test_production_has_no_builtin_authorities() {
        assert!(Environment::Production.builtin_authorities().is_empty());
    }
}
