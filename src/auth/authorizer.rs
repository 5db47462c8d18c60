//! Per-tenant common-name allow-listing.

use std::sync::Arc;

use crate::domain::{TenantDirectory, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Authorized,
    Forbidden,
}

impl Decision {
    pub fn is_authorized(self) -> bool {
        self == Decision::Authorized
    }
}

#[derive(Debug, Clone)]
pub struct Authorizer {
    directory: Arc<TenantDirectory>,
}

impl Authorizer {
    pub fn new(directory: Arc<TenantDirectory>) -> Self {
        Self { directory }
    }

    /// Exact, case-sensitive membership of `common_name` in the tenant's
    /// allow-list. Unknown tenants are never authorized.
    pub fn authorize(&self, tenant_id: &TenantId, common_name: &str) -> Decision {
        match self.directory.get(tenant_id.as_str()) {
            Some(tenant) if tenant.allows_common_name(common_name) => Decision::Authorized,
            _ => Decision::Forbidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tenant;
    use proptest::prelude::*;

    fn authorizer() -> Authorizer {
        let directory = TenantDirectory::new([
            Tenant::new("ee", "ee_password", ["ee.tls.test.notify", "ee.vpn.test.notify"]),
            Tenant::new("o2", "o2_password", Vec::<String>::new()),
        ])
        .unwrap();
        Authorizer::new(Arc::new(directory))
    }

    #[test]
    fn test_listed_common_name_authorized() {
        let decision = authorizer().authorize(&TenantId::new("ee"), "ee.tls.test.notify");
        assert_eq!(decision, Decision::Authorized);
        assert!(decision.is_authorized());
    }

    #[test]
    fn test_other_tenants_names_forbidden() {
        assert_eq!(
            authorizer().authorize(&TenantId::new("ee"), "fakemno.tls.test.notify"),
            Decision::Forbidden
        );
    }

    #[test]
    fn test_match_is_exact() {
        let authorizer = authorizer();
        let ee = TenantId::new("ee");
        assert_eq!(authorizer.authorize(&ee, "EE.tls.test.notify"), Decision::Forbidden);
        assert_eq!(authorizer.authorize(&ee, "ee.tls.test.notify."), Decision::Forbidden);
        assert_eq!(authorizer.authorize(&ee, "*.tls.test.notify"), Decision::Forbidden);
    }

    #[test]
    fn test_empty_allow_list_forbids_everything() {
        assert_eq!(
            authorizer().authorize(&TenantId::new("o2"), "o2.tls.test.notify"),
            Decision::Forbidden
        );
    }

    proptest! {
        #[test]
        fn prop_forbidden_iff_not_listed(common_name in "[a-z.]{1,24}") {
            let listed = ["ee.tls.test.notify", "ee.vpn.test.notify"].contains(&common_name.as_str());
            let decision = authorizer().authorize(&TenantId::new("ee"), &common_name);
            prop_assert_eq!(decision == Decision::Forbidden, !listed);
        }
    }
}
