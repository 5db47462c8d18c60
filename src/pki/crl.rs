//! Fetches each CA's published certificate revocation list.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, instrument};

use crate::domain::CertificateAuthority;
use crate::errors::Error;
use crate::observability::metrics;
use crate::storage::{ObjectStore, ObjectStoreError};

/// MIME type of a DER-encoded CRL
pub const CRL_CONTENT_TYPE: &str = "application/pkix-crl";

/// Every storage failure collapses into this one error; the cause is kept
/// for logs only.
#[derive(Debug, thiserror::Error)]
#[error("CRL retrieval failed for {ca_name}")]
pub struct CrlError {
    ca_name: String,
    #[source]
    source: ObjectStoreError,
}

impl From<CrlError> for Error {
    fn from(error: CrlError) -> Self {
        Error::upstream("CRL retrieval failed", error)
    }
}

pub struct CrlRetriever {
    store: Arc<dyn ObjectStore>,
}

impl CrlRetriever {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Return the CRL bytes exactly as stored
    #[instrument(skip_all, fields(ca = %authority.name(), bucket = %authority.revocation_bucket()))]
    pub async fn retrieve(&self, authority: &CertificateAuthority) -> Result<Bytes, CrlError> {
        let key = authority.crl_object_key();
        match self.store.get(authority.revocation_bucket(), &key).await {
            Ok(body) => {
                metrics::record_crl_request(authority.name().as_str(), "success");
                Ok(body)
            }
            Err(source) => {
                error!(key = %key, error = %source, "Failed to retrieve CRL");
                metrics::record_crl_request(authority.name().as_str(), "failure");
                Err(CrlError { ca_name: authority.name().to_string(), source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryObjectStore;

    fn vpn() -> CertificateAuthority {
        CertificateAuthority::new("vpn", "1", "1234", "vpn-revocations")
    }

    #[tokio::test]
    async fn test_returns_stored_bytes_untouched() {
        let store = Arc::new(InMemoryObjectStore::new());
        let crl = Bytes::from_static(&[0x30, 0x82, 0x01, 0x00, 0xff]);
        store.put("vpn-revocations", "crl/1.crl", crl.clone());

        let body = CrlRetriever::new(store).retrieve(&vpn()).await.unwrap();
        assert_eq!(body, crl);
    }

    #[tokio::test]
    async fn test_missing_object_is_generic_failure() {
        let retriever = CrlRetriever::new(Arc::new(InMemoryObjectStore::new()));
        let err = retriever.retrieve(&vpn()).await.unwrap_err();
        assert_eq!(err.to_string(), "CRL retrieval failed for vpn");

        let error: Error = err.into();
        assert_eq!(error.status_code(), 500);
        assert_eq!(error.to_string(), "Upstream failure: CRL retrieval failed");
    }
}
