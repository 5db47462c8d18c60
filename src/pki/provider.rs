//! Seam between issuance logic and the certificate authority service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::aws::AwsError;
use crate::domain::{AuthorityRef, CertificateHandle};

/// Signature algorithm requested for every issued certificate
pub const SIGNING_ALGORITHM: &str = "SHA256WITHRSA";

/// Validity requested for every issued certificate, in days
pub const VALIDITY_DAYS: u32 = 365;

/// Status reported by the provider for a submitted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceStatus {
    Pending,
    Issued,
    Failed(String),
}

/// A certificate and its chain, both PEM, exactly as the provider returned them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IssuedCertificate {
    pub certificate: String,
    pub certificate_chain: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Certificate authority rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Aws(#[from] AwsError),
}

/// Operations the gatekeeper needs from a certificate authority service
#[async_trait]
pub trait CaProvider: Send + Sync {
    /// Submit a CSR for signing and return the provider's handle for it
    async fn submit(
        &self,
        authority: &AuthorityRef,
        csr_pem: &[u8],
        signing_algorithm: &str,
        validity_days: u32,
    ) -> Result<CertificateHandle, ProviderError>;

    /// Report whether the certificate behind `handle` has been issued yet
    async fn issuance_status(
        &self,
        authority: &AuthorityRef,
        handle: &CertificateHandle,
    ) -> Result<IssuanceStatus, ProviderError>;

    /// Fetch an issued certificate and its chain
    async fn fetch(
        &self,
        authority: &AuthorityRef,
        handle: &CertificateHandle,
    ) -> Result<IssuedCertificate, ProviderError>;
}
