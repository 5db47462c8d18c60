//! Role credentials from the ECS container endpoint and EC2 instance
//! metadata, and the default chain that tries each source in turn.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::credentials::{env_var, Credentials, EnvironmentCredentials, ProvideCredentials};
use super::{parse_endpoint, AwsError};

pub const CONTAINER_RELATIVE_URI_VAR: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
pub const CONTAINER_FULL_URI_VAR: &str = "AWS_CONTAINER_CREDENTIALS_FULL_URI";
pub const CONTAINER_AUTHORIZATION_TOKEN_VAR: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN";
pub const IMDS_ENDPOINT_VAR: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";
pub const IMDS_DISABLED_VAR: &str = "AWS_EC2_METADATA_DISABLED";

const CONTAINER_HOST: &str = "http://169.254.170.2";
const IMDS_ENDPOINT: &str = "http://169.254.169.254";
const IMDS_TOKEN_PATH: &str = "latest/api/token";
const IMDS_ROLES_PATH: &str = "latest/meta-data/iam/security-credentials/";
const IMDS_TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const IMDS_TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const IMDS_TOKEN_TTL_SECS: u32 = 21600;

/// Credential document served by both the container endpoint and IMDS
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCredentials {
    #[serde(default)]
    code: Option<String>,
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
}

impl RoleCredentials {
    fn parse(source: &str, body: &[u8]) -> Result<Credentials, AwsError> {
        let document: RoleCredentials = serde_json::from_slice(body)
            .map_err(|e| AwsError::MalformedResponse(format!("{} credentials: {}", source, e)))?;
        if let Some(code) = document.code.as_deref().filter(|code| *code != "Success") {
            return Err(AwsError::CredentialsUnavailable(format!("{} returned code {}", source, code)));
        }

        let credentials =
            Credentials::new(document.access_key_id, document.secret_access_key, document.token);
        Ok(match document.expiration {
            Some(expiration) => credentials.with_expiry(expiration),
            None => credentials,
        })
    }
}

async fn read_body(response: reqwest::Response) -> Result<bytes::Bytes, AwsError> {
    let status = response.status();
    if !status.is_success() {
        return Err(AwsError::CredentialsEndpoint {
            endpoint: response.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.bytes().await?)
}

fn join(base: &Url, path: &str) -> Result<Url, AwsError> {
    base.join(path).map_err(|e| AwsError::InvalidEndpoint {
        endpoint: format!("{}{}", base, path),
        reason: e.to_string(),
    })
}

/// ECS task role credentials
pub struct ContainerCredentials {
    client: Client,
    endpoint: Url,
    authorization: Option<String>,
}

impl ContainerCredentials {
    pub fn new(client: Client, endpoint: Url, authorization: Option<String>) -> Self {
        Self { client, endpoint, authorization }
    }

    /// Configured from the ECS agent's variables; `None` outside a task.
    pub fn from_env(client: Client) -> Result<Option<Self>, AwsError> {
        let endpoint = match (env_var(CONTAINER_RELATIVE_URI_VAR), env_var(CONTAINER_FULL_URI_VAR)) {
            (Some(relative), _) => parse_endpoint(&format!("{}{}", CONTAINER_HOST, relative))?,
            (None, Some(full)) => parse_endpoint(&full)?,
            (None, None) => return Ok(None),
        };
        Ok(Some(Self::new(client, endpoint, env_var(CONTAINER_AUTHORIZATION_TOKEN_VAR))))
    }
}

#[async_trait]
impl ProvideCredentials for ContainerCredentials {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn provide_credentials(&self) -> Result<Credentials, AwsError> {
        let mut request = self.client.get(self.endpoint.clone());
        if let Some(token) = &self.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, token.as_str());
        }
        let body = read_body(request.send().await?).await?;
        RoleCredentials::parse("container endpoint", &body)
    }
}

/// EC2 instance profile credentials over IMDSv2
pub struct InstanceMetadataCredentials {
    client: Client,
    endpoint: Url,
}

impl InstanceMetadataCredentials {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// `None` when `AWS_EC2_METADATA_DISABLED=true`
    pub fn from_env(client: Client) -> Result<Option<Self>, AwsError> {
        if env_var(IMDS_DISABLED_VAR).is_some_and(|value| value.eq_ignore_ascii_case("true")) {
            return Ok(None);
        }
        let endpoint = env_var(IMDS_ENDPOINT_VAR).unwrap_or_else(|| IMDS_ENDPOINT.to_string());
        Ok(Some(Self::new(client, parse_endpoint(&endpoint)?)))
    }

    async fn session_token(&self) -> Result<String, AwsError> {
        let response = self
            .client
            .put(join(&self.endpoint, IMDS_TOKEN_PATH)?)
            .header(IMDS_TOKEN_TTL_HEADER, IMDS_TOKEN_TTL_SECS.to_string())
            .send()
            .await?;
        let body = read_body(response).await?;
        Ok(String::from_utf8_lossy(&body).trim().to_string())
    }

    async fn get(&self, path: &str, token: &str) -> Result<bytes::Bytes, AwsError> {
        let response = self
            .client
            .get(join(&self.endpoint, path)?)
            .header(IMDS_TOKEN_HEADER, token)
            .send()
            .await?;
        read_body(response).await
    }
}

#[async_trait]
impl ProvideCredentials for InstanceMetadataCredentials {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn provide_credentials(&self) -> Result<Credentials, AwsError> {
        let token = self.session_token().await?;
        let roles = self.get(IMDS_ROLES_PATH, &token).await?;
        let roles = String::from_utf8_lossy(&roles);
        let role = roles
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| AwsError::CredentialsUnavailable("no IAM role attached to the instance".to_string()))?;

        debug!(role = %role, "Fetching instance profile credentials");
        let body = self.get(&format!("{}{}", IMDS_ROLES_PATH, role), &token).await?;
        RoleCredentials::parse("instance metadata", &body)
    }
}

/// Environment, then the container endpoint, then instance metadata. The
/// first source that answers wins.
pub struct DefaultCredentialsChain {
    sources: Vec<(&'static str, Box<dyn ProvideCredentials>)>,
}

impl DefaultCredentialsChain {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    /// Append a source, tried after every source added before it
    pub fn with_source(mut self, name: &'static str, source: impl ProvideCredentials + 'static) -> Self {
        self.sources.push((name, Box::new(source)));
        self
    }

    /// `client` is used for the metadata endpoints only and should carry a
    /// short timeout.
    pub fn from_env(client: Client) -> Result<Self, AwsError> {
        let mut chain = Self::new().with_source("environment", EnvironmentCredentials);
        if let Some(container) = ContainerCredentials::from_env(client.clone())? {
            chain = chain.with_source("container", container);
        }
        if let Some(imds) = InstanceMetadataCredentials::from_env(client)? {
            chain = chain.with_source("instance-metadata", imds);
        }
        Ok(chain)
    }

    pub fn source_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sources.iter().map(|(name, _)| *name)
    }
}

impl Default for DefaultCredentialsChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvideCredentials for DefaultCredentialsChain {
    async fn provide_credentials(&self) -> Result<Credentials, AwsError> {
        let mut failures = Vec::with_capacity(self.sources.len());
        for (name, source) in &self.sources {
            match source.provide_credentials().await {
                Ok(credentials) => {
                    debug!(source = %name, "AWS credentials resolved");
                    return Ok(credentials);
                }
                Err(e) => {
                    debug!(source = %name, error = %e, "AWS credentials source unavailable");
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }
        Err(AwsError::CredentialsUnavailable(failures.join("; ")))
    }
}
