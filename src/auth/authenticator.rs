//! Tenant credential verification.

use std::sync::Arc;

use crate::domain::{SecretDigest, TenantDirectory, TenantId};
use crate::errors::Error;

/// Why a request failed authentication. Both variants surface identically to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("unauthorized: basic credentials missing")]
    MissingCredentials,
    #[error("unauthorized: invalid credentials")]
    InvalidCredentials,
}

impl From<AuthError> for Error {
    fn from(_: AuthError) -> Self {
        Error::Unauthenticated
    }
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    directory: Arc<TenantDirectory>,
    /// Compared against when the claimed tenant does not exist
    decoy: SecretDigest,
}

impl Authenticator {
    pub fn new(directory: Arc<TenantDirectory>) -> Self {
        let decoy = SecretDigest::of(uuid::Uuid::new_v4().as_bytes());
        Self { directory, decoy }
    }

    /// Return the tenant id iff it exists and `secret` matches its digest.
    pub fn authenticate(&self, tenant_id: &str, secret: &str) -> Result<TenantId, AuthError> {
        let tenant = self.directory.get(tenant_id);
        let digest = tenant.map(|tenant| tenant.secret()).unwrap_or(&self.decoy);
        let secret_matches = digest.matches(secret.as_bytes());

        match tenant {
            Some(tenant) if secret_matches => Ok(tenant.id().clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}
