//! Wires configuration into the runtime collaborators.

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::api::{build_router, ApiState};
use crate::auth::{Authenticator, Authorizer};
use crate::aws::{self, CredentialsCache, DefaultCredentialsChain, ProvideCredentials};
use crate::config::AppConfig;
use crate::errors::{Error, Result};
use crate::pki::{AcmPcaClient, CaProvider, CrlRetriever, IssuanceOrchestrator};
use crate::storage::{ObjectStore, S3ObjectStore};

/// Everything a router needs, built once at startup
pub struct Application {
    pub state: ApiState,
    pub authenticator: Authenticator,
}

impl Application {
    /// Assemble from explicit collaborators
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn ObjectStore>,
        issuer: IssuanceOrchestrator,
    ) -> Result<Self> {
        let registry = Arc::new(config.ca_registry()?);
        let directory = Arc::new(config.tenant_directory()?);
        info!(authorities = registry.len(), tenants = directory.len(), "Loaded authorities and tenants");

        let state = ApiState {
            registry,
            authorizer: Authorizer::new(directory.clone()),
            crl_retriever: Arc::new(CrlRetriever::new(store)),
            issuer: Arc::new(issuer),
        };

        Ok(Self { state, authenticator: Authenticator::new(directory) })
    }

    /// Assemble against AWS. Credentials come from the environment, the ECS
    /// container endpoint or instance metadata, resolved on first use.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let metadata_client = aws::metadata_client()
            .map_err(|e| Error::config_with_source("Failed to create metadata client", Box::new(e)))?;
        let chain = DefaultCredentialsChain::from_env(metadata_client)
            .map_err(|e| Error::config_with_source("Invalid AWS credentials configuration", Box::new(e)))?;
        info!(sources = ?chain.source_names().collect::<Vec<_>>(), "AWS credential sources");
        let credentials: Arc<dyn ProvideCredentials> =
            Arc::new(CredentialsCache::new(Arc::new(chain)));

        let client = aws::http_client(config.aws.request_timeout())
            .map_err(|e| Error::config_with_source("Failed to create HTTP client", Box::new(e)))?;

        let store = S3ObjectStore::new(
            client.clone(),
            credentials.clone(),
            config.aws.region.as_str(),
            config.aws.s3_endpoint.as_deref(),
        )
        .map_err(|e| Error::config_with_source("Invalid S3 configuration", Box::new(e)))?;

        let provider: Arc<dyn CaProvider> = Arc::new(
            AcmPcaClient::new(
                client,
                credentials,
                &config.aws.region,
                config.aws.acm_pca_endpoint.as_deref(),
            )
            .map_err(|e| Error::config_with_source("Invalid ACM PCA configuration", Box::new(e)))?,
        );

        info!(region = %config.aws.region, "AWS clients initialized");
        Self::new(config, Arc::new(store), IssuanceOrchestrator::new(provider))
    }

    pub fn router(self, max_body_size: usize) -> Router {
        build_router(self.state, self.authenticator, max_body_size)
    }
}
