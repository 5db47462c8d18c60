//! # AWS Plumbing
//!
//! Signed-request support shared by the S3 object store and the ACM Private
//! CA client: credential resolution, SigV4 signing and preconfigured
//! `reqwest` clients.

pub mod credentials;
pub mod providers;
pub mod sigv4;

use std::time::Duration;

pub use credentials::{Credentials, CredentialsCache, EnvironmentCredentials, ProvideCredentials};
pub use providers::{ContainerCredentials, DefaultCredentialsChain, InstanceMetadataCredentials};
pub use sigv4::{amz_date, sha256_hex, uri_encode, Signer};

/// Metadata endpoints are link-local; anything slower means they are absent
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors raised while talking to AWS
#[derive(Debug, thiserror::Error)]
pub enum AwsError {
    #[error("Missing AWS credential environment variable {0}")]
    MissingCredentials(&'static str),

    #[error("No AWS credentials available: {0}")]
    CredentialsUnavailable(String),

    #[error("Credentials endpoint {endpoint} answered {status}")]
    CredentialsEndpoint { endpoint: String, status: u16 },

    #[error("Invalid signing key")]
    InvalidSigningKey,

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AWS service error {status} {code}: {message}")]
    Service { status: u16, code: String, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl AwsError {
    /// The AWS error code, when the service returned one
    pub fn service_code(&self) -> Option<&str> {
        match self {
            AwsError::Service { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

/// Build the HTTP client used for every AWS call
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AwsError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AwsError::Http)
}

/// Client for the container and instance metadata credential endpoints
pub fn metadata_client() -> Result<reqwest::Client, AwsError> {
    http_client(METADATA_TIMEOUT)
}

/// Parse an endpoint override, rejecting anything that cannot carry a path.
pub fn parse_endpoint(endpoint: &str) -> Result<url::Url, AwsError> {
    let url = url::Url::parse(endpoint).map_err(|e| AwsError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(AwsError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint must be an absolute http(s) URL".to_string(),
        });
    }
    Ok(url)
}

/// Value for the `Host` header of a URL, including a non-default port.
pub(crate) fn host_header(url: &url::Url) -> Result<String, AwsError> {
    let host = url.host_str().ok_or_else(|| AwsError::InvalidEndpoint {
        endpoint: url.to_string(),
        reason: "missing host".to_string(),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
