//! Tenants (mobile network operators) and the directory that holds them.

use std::collections::{HashMap, HashSet};
use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::id::TenantId;
use crate::errors::{Error, Result};

/// SHA-256 digest of a tenant secret.
///
/// Plaintext secrets are hashed as soon as they are loaded; comparisons run
/// over the fixed-length digests so neither the secret length nor the position
/// of the first mismatching byte influences timing.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretDigest([u8; 32]);

impl SecretDigest {
    pub fn of(secret: &[u8]) -> Self {
        Self(Sha256::digest(secret).into())
    }

    /// Constant-time check of a presented secret against this digest.
    pub fn matches(&self, presented: &[u8]) -> bool {
        let presented = Self::of(presented);
        self.0.ct_eq(&presented.0).into()
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretDigest([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct Tenant {
    id: TenantId,
    secret: SecretDigest,
    allowed_common_names: HashSet<String>,
}

impl Tenant {
    pub fn new<I, S>(id: impl Into<TenantId>, secret: &str, allowed_common_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            secret: SecretDigest::of(secret.as_bytes()),
            allowed_common_names: allowed_common_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id(&self) -> &TenantId {
        &self.id
    }

    pub fn secret(&self) -> &SecretDigest {
        &self.secret
    }

    /// Exact-string membership; no wildcard or case folding.
    pub fn allows_common_name(&self, common_name: &str) -> bool {
        self.allowed_common_names.contains(common_name)
    }
}

/// Immutable tenant id → tenant map, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct TenantDirectory {
    tenants: HashMap<TenantId, Tenant>,
}

impl TenantDirectory {
    pub fn new(tenants: impl IntoIterator<Item = Tenant>) -> Result<Self> {
        let mut map = HashMap::new();
        for tenant in tenants {
            if tenant.id.as_str().trim().is_empty() {
                return Err(Error::validation_field("tenant id cannot be empty", "tenants"));
            }
            if tenant.id.as_str().contains(':') {
                // basic-auth usernames cannot contain a colon
                return Err(Error::validation_field(
                    format!("tenant id '{}' cannot contain ':'", tenant.id),
                    format!("tenants.{}", tenant.id),
                ));
            }
            let id = tenant.id.clone();
            if map.insert(id.clone(), tenant).is_some() {
                return Err(Error::validation(format!("tenant '{}' is defined more than once", id)));
            }
        }
        Ok(Self { tenants: map })
    }

    pub fn get(&self, tenant_id: &str) -> Option<&Tenant> {
        self.tenants.get(tenant_id)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_digest_matches() {
        let digest = SecretDigest::of(b"ee_password");
        assert!(digest.matches(b"ee_password"));
        assert!(!digest.matches(b"ee_passwore"));
        assert!(!digest.matches(b"ee_password "));
        assert!(!digest.matches(b""));
    }

    #[test]
    fn test_secret_digest_debug_is_redacted() {
        let digest = SecretDigest::of(b"ee_password");
        assert_eq!(format!("{:?}", digest), "SecretDigest([REDACTED])");
        let tenant = Tenant::new("ee", "ee_password", ["ee.tls.test.notify"]);
        assert!(!format!("{:?}", tenant).contains("ee_password"));
    }

    #[test]
    fn test_common_name_membership_is_exact() {
        let tenant = Tenant::new("ee", "ee_password", ["ee.tls.test.notify"]);
        assert!(tenant.allows_common_name("ee.tls.test.notify"));
        assert!(!tenant.allows_common_name("EE.tls.test.notify"));
        assert!(!tenant.allows_common_name("*.tls.test.notify"));
        assert!(!tenant.allows_common_name("ee.tls.test.notify."));
    }

    #[test]
    fn test_directory_rejects_duplicates() {
        let result = TenantDirectory::new([
            Tenant::new("ee", "a", Vec::<String>::new()),
            Tenant::new("ee", "b", Vec::<String>::new()),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_directory_rejects_colon_in_id() {
        let result = TenantDirectory::new([Tenant::new("e:e", "a", Vec::<String>::new())]);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_directory_lookup() {
        let directory = TenantDirectory::new([
            Tenant::new("ee", "ee_password", ["ee.tls.test.notify"]),
            Tenant::new("vodafone", "vodafone_password", ["vodafone.tls.test.notify"]),
        ])
        .unwrap();
        assert_eq!(directory.len(), 2);
        assert!(directory.get("ee").is_some());
        assert!(directory.get("three").is_none());
    }
}
