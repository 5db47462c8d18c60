//! Private certificate authorities and the registry that resolves them by name.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::id::CaName;
use crate::errors::{Error, Result};

/// Prefix of every fully-qualified authority reference issued by the provider.
pub const AUTHORITY_REF_SCHEME: &str = "arn:aws:acm-pca";

/// Identity of one private CA as known to the external provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateAuthority {
    name: CaName,
    ca_identifier: String,
    account_namespace: String,
    revocation_bucket: String,
}

impl CertificateAuthority {
    pub fn new(
        name: impl Into<CaName>,
        ca_identifier: impl Into<String>,
        account_namespace: impl Into<String>,
        revocation_bucket: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ca_identifier: ca_identifier.into(),
            account_namespace: account_namespace.into(),
            revocation_bucket: revocation_bucket.into(),
        }
    }

    pub fn name(&self) -> &CaName {
        &self.name
    }

    pub fn ca_identifier(&self) -> &str {
        &self.ca_identifier
    }

    pub fn account_namespace(&self) -> &str {
        &self.account_namespace
    }

    /// Bucket the provider publishes this CA's revocation list into
    pub fn revocation_bucket(&self) -> &str {
        &self.revocation_bucket
    }

    /// Object key of the DER-encoded CRL inside [`Self::revocation_bucket`]
    pub fn crl_object_key(&self) -> String {
        format!("crl/{}.crl", self.ca_identifier)
    }
}

/// Fully-qualified reference to a CA, as the provider expects it on every call.
///
/// Shape: `arn:aws:acm-pca:<region>:<account_namespace>:certificate-authority/<ca_identifier>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorityRef(String);

impl AuthorityRef {
    pub fn new(region: &str, authority: &CertificateAuthority) -> Self {
        Self(format!(
            "{}:{}:{}:certificate-authority/{}",
            AUTHORITY_REF_SCHEME, region, authority.account_namespace, authority.ca_identifier
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable name → CA map, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct CaRegistry {
    region: String,
    authorities: HashMap<CaName, CertificateAuthority>,
}

impl CaRegistry {
    /// Build the registry, rejecting duplicate names and incomplete entries.
    pub fn new(
        region: impl Into<String>,
        authorities: impl IntoIterator<Item = CertificateAuthority>,
    ) -> Result<Self> {
        let region = region.into();
        if region.trim().is_empty() {
            return Err(Error::validation_field("region cannot be empty", "aws.region"));
        }

        let mut map = HashMap::new();
        for authority in authorities {
            for (field, value) in [
                ("ca_identifier", authority.ca_identifier.as_str()),
                ("account_namespace", authority.account_namespace.as_str()),
                ("revocation_bucket", authority.revocation_bucket.as_str()),
            ] {
                if value.trim().is_empty() {
                    return Err(Error::validation_field(
                        format!("certificate authority '{}' has an empty {}", authority.name, field),
                        format!("authorities.{}.{}", authority.name, field),
                    ));
                }
            }

            let name = authority.name.clone();
            if map.insert(name.clone(), authority).is_some() {
                return Err(Error::validation(format!(
                    "certificate authority '{}' is defined more than once",
                    name
                )));
            }
        }

        Ok(Self { region, authorities: map })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn get(&self, name: &str) -> Option<&CertificateAuthority> {
        self.authorities.get(name)
    }

    /// Resolve a CA name or fail with [`Error::NotFound`].
    pub fn lookup(&self, name: &str) -> Result<&CertificateAuthority> {
        self.get(name).ok_or_else(|| Error::not_found("certificate authority", name))
    }

    /// Authority reference for a CA held by this registry.
    pub fn authority_ref(&self, authority: &CertificateAuthority) -> AuthorityRef {
        AuthorityRef::new(&self.region, authority)
    }

    pub fn names(&self) -> impl Iterator<Item = &CaName> {
        self.authorities.keys()
    }

    pub fn len(&self) -> usize {
        self.authorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CaRegistry {
        CaRegistry::new(
            "eu-west-2",
            [
                CertificateAuthority::new("vpn", "1", "1234", "vpn-revocation"),
                CertificateAuthority::new("tls", "2", "5678", "tls-revocation"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_known_names() {
        let registry = registry();
        assert_eq!(registry.lookup("vpn").unwrap().ca_identifier(), "1");
        assert_eq!(registry.lookup("tls").unwrap().account_namespace(), "5678");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lookup_unknown_name_is_not_found() {
        let err = registry().lookup("pigeon").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = registry();
        assert!(registry.get("VPN").is_none());
        assert!(registry.get(" vpn").is_none());
    }

    #[test]
    fn test_authority_ref_shape() {
        let registry = registry();
        let tls = registry.lookup("tls").unwrap();
        assert_eq!(
            registry.authority_ref(tls).as_str(),
            "arn:aws:acm-pca:eu-west-2:5678:certificate-authority/2"
        );
    }

    #[test]
    fn test_crl_object_key() {
        let authority =
            CertificateAuthority::new("vpn", "fb0bf875-66a5-4447-bae3-403c457bda2d", "1", "b");
        assert_eq!(authority.crl_object_key(), "crl/fb0bf875-66a5-4447-bae3-403c457bda2d.crl");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = CaRegistry::new(
            "eu-west-2",
            [
                CertificateAuthority::new("vpn", "1", "1234", "a"),
                CertificateAuthority::new("vpn", "2", "1234", "b"),
            ],
        );
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let result =
            CaRegistry::new("eu-west-2", [CertificateAuthority::new("vpn", "", "1234", "a")]);
        match result {
            Err(Error::Validation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("authorities.vpn.ca_identifier"))
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }
}
