//! Common test utilities for all integration tests.
//!
//! Provides a scripted CA provider, an in-memory object store and a router
//! wired the same way as production.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::ServiceExt;

use pca_gatekeeper::aws::AwsError;
use pca_gatekeeper::config::{AppConfig, AuthorityConfig, TenantConfig};
use pca_gatekeeper::domain::{AuthorityRef, CertificateHandle};
use pca_gatekeeper::pki::{
    CaProvider, IssuanceOrchestrator, IssuanceStatus, IssuedCertificate, ManualClock,
    ProviderError, WaitPolicy,
};
use pca_gatekeeper::storage::InMemoryObjectStore;
use pca_gatekeeper::Application;

pub const TENANT: &str = "ee";
pub const TENANT_SECRET: &str = "ee_password";
pub const ALLOWED_CN: &str = "ee.tls.test.notify";

/// One recorded `submit` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub authority: String,
    pub csr: Vec<u8>,
    pub signing_algorithm: String,
    pub validity_days: u32,
}

/// CA provider that follows a script and records every call
pub struct ScriptedProvider {
    pub submissions: Mutex<Vec<Submission>>,
    pub status_checks: Mutex<u32>,
    pub fetches: Mutex<Vec<(String, String)>>,
    statuses: Mutex<VecDeque<Result<IssuanceStatus, ProviderError>>>,
    reject_submit: bool,
    fail_fetch: bool,
    issued: IssuedCertificate,
}

impl ScriptedProvider {
    /// Provider that reports `statuses` in order and `Pending` once they run out
    pub fn new(statuses: Vec<IssuanceStatus>) -> Self {
        Self::replying(statuses.into_iter().map(Ok).collect())
    }

    /// Provider whose status checks return `replies` in order, errors included
    pub fn replying(replies: Vec<Result<IssuanceStatus, ProviderError>>) -> Self {
        Self {
            submissions: Mutex::new(Vec::new()),
            status_checks: Mutex::new(0),
            fetches: Mutex::new(Vec::new()),
            statuses: Mutex::new(replies.into()),
            reject_submit: false,
            fail_fetch: false,
            issued: issued_certificate(),
        }
    }

    pub fn issuing_immediately() -> Self {
        Self::new(vec![IssuanceStatus::Issued])
    }

    pub fn never_issuing() -> Self {
        Self::new(Vec::new())
    }

    pub fn rejecting() -> Self {
        Self { reject_submit: true, ..Self::new(Vec::new()) }
    }

    /// Reports the certificate issued but cannot return it
    pub fn failing_fetch() -> Self {
        Self { fail_fetch: true, ..Self::issuing_immediately() }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn status_checks(&self) -> u32 {
        *self.status_checks.lock().unwrap()
    }

    pub fn was_contacted(&self) -> bool {
        !self.submissions().is_empty()
            || self.status_checks() > 0
            || !self.fetches.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl CaProvider for ScriptedProvider {
    async fn submit(
        &self,
        authority: &AuthorityRef,
        csr_pem: &[u8],
        signing_algorithm: &str,
        validity_days: u32,
    ) -> Result<CertificateHandle, ProviderError> {
        self.submissions.lock().unwrap().push(Submission {
            authority: authority.to_string(),
            csr: csr_pem.to_vec(),
            signing_algorithm: signing_algorithm.to_string(),
            validity_days,
        });
        if self.reject_submit {
            return Err(ProviderError::Rejected("MalformedCSRException: rejected".to_string()));
        }
        Ok(CertificateHandle::new(format!("{}/certificate/0123456789abcdef", authority)))
    }

    async fn issuance_status(
        &self,
        _authority: &AuthorityRef,
        _handle: &CertificateHandle,
    ) -> Result<IssuanceStatus, ProviderError> {
        *self.status_checks.lock().unwrap() += 1;
        let next = self.statuses.lock().unwrap().pop_front();
        next.unwrap_or(Ok(IssuanceStatus::Pending))
    }

    async fn fetch(
        &self,
        authority: &AuthorityRef,
        handle: &CertificateHandle,
    ) -> Result<IssuedCertificate, ProviderError> {
        self.fetches.lock().unwrap().push((authority.to_string(), handle.to_string()));
        if self.fail_fetch {
            return Err(service_error("ThrottlingException", "Rate exceeded"));
        }
        Ok(self.issued.clone())
    }
}

/// Error as the ACM client reports a JSON 1.1 service fault
pub fn service_error(code: &str, message: &str) -> ProviderError {
    ProviderError::Aws(AwsError::Service {
        status: 400,
        code: code.to_string(),
        message: message.to_string(),
    })
}

pub fn issued_certificate() -> IssuedCertificate {
    IssuedCertificate {
        certificate: "-----BEGIN CERTIFICATE-----\nMIIBleaf\n-----END CERTIFICATE-----\n".to_string(),
        certificate_chain: "-----BEGIN CERTIFICATE-----\nMIIBroot\n-----END CERTIFICATE-----\n"
            .to_string(),
    }
}

/// Two CAs in eu-west-2 and a single tenant allowed one common name
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.aws.region = "eu-west-2".to_string();
    config.authorities.insert(
        "vpn".to_string(),
        AuthorityConfig {
            ca_id: "1".to_string(),
            revocation_bucket: "vpn-revocations".to_string(),
            account_id: "1234".to_string(),
        },
    );
    config.authorities.insert(
        "tls".to_string(),
        AuthorityConfig {
            ca_id: "2".to_string(),
            revocation_bucket: "tls-revocations".to_string(),
            account_id: "5678".to_string(),
        },
    );
    config.tenants.insert(
        TENANT.to_string(),
        TenantConfig {
            secret: TENANT_SECRET.to_string(),
            allowed_common_names: vec![ALLOWED_CN.to_string()],
        },
    );
    config
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<ScriptedProvider>,
    pub store: Arc<InMemoryObjectStore>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new(provider: ScriptedProvider) -> Self {
        let config = test_config();
        let provider = Arc::new(provider);
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(ManualClock::new());

        let issuer =
            IssuanceOrchestrator::with_clock(provider.clone(), clock.clone(), WaitPolicy::default());
        let router = Application::new(&config, store.clone(), issuer)
            .expect("test configuration is valid")
            .router(config.server.max_body_size);

        Self { router, provider, store, clock }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.expect("body collects").to_bytes();
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn sign(&self, ca_name: &str, credentials: Option<(&str, &str)>, csr: impl Into<Body>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/{}/sign-certificate", ca_name))
            .header(header::CONTENT_TYPE, "application/x-pem-file");
        if let Some((user, password)) = credentials {
            builder = builder.header(header::AUTHORIZATION, basic_auth(user, password));
        }
        self.send(builder.body(csr.into()).unwrap()).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
}

/// PEM CSR for `common_name` signed by a fresh key
pub fn csr_pem(common_name: &str) -> String {
    let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(rcgen::DnType::CommonName, common_name);
    let key = rcgen::KeyPair::generate().unwrap();
    params.serialize_request(&key).unwrap().pem().unwrap()
}
