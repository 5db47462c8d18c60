//! ACM Private CA client speaking the AWS JSON 1.1 protocol.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::provider::{CaProvider, IssuanceStatus, IssuedCertificate, ProviderError};
use crate::aws::{self, amz_date, sha256_hex, AwsError, ProvideCredentials, Signer};
use crate::domain::{AuthorityRef, CertificateHandle};

const SERVICE: &str = "acm-pca";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "ACMPrivateCA";

const REQUEST_IN_PROGRESS: &str = "RequestInProgressException";
const REQUEST_FAILED: &str = "RequestFailedException";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Validity {
    value: u32,
    #[serde(rename = "Type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct IssueCertificateRequest<'a> {
    certificate_authority_arn: &'a str,
    csr: String,
    signing_algorithm: &'a str,
    validity: Validity,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IssueCertificateResponse {
    certificate_arn: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetCertificateRequest<'a> {
    certificate_authority_arn: &'a str,
    certificate_arn: &'a str,
}

pub struct AcmPcaClient {
    client: Client,
    credentials: Arc<dyn ProvideCredentials>,
    signer: Signer,
    endpoint: Url,
}

impl AcmPcaClient {
    pub fn new(
        client: Client,
        credentials: Arc<dyn ProvideCredentials>,
        region: &str,
        endpoint: Option<&str>,
    ) -> Result<Self, AwsError> {
        let endpoint = match endpoint {
            Some(endpoint) => aws::parse_endpoint(endpoint)?,
            None => aws::parse_endpoint(&format!("https://acm-pca.{}.amazonaws.com/", region))?,
        };
        Ok(Self { client, credentials, signer: Signer::new(region, SERVICE), endpoint })
    }

    async fn call<T: Serialize>(&self, operation: &str, body: &T) -> Result<Value, AwsError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| AwsError::MalformedResponse(format!("unserializable request: {}", e)))?;
        let credentials = self.credentials.provide_credentials().await?;
        let now = Utc::now();
        let payload_hash = sha256_hex(&payload);
        let target = format!("{}.{}", TARGET_PREFIX, operation);

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), CONTENT_TYPE.to_string());
        headers.insert("host".to_string(), aws::host_header(&self.endpoint)?);
        headers.insert("x-amz-date".to_string(), amz_date(now));
        headers.insert("x-amz-target".to_string(), target);
        if let Some(token) = credentials.session_token() {
            headers.insert("x-amz-security-token".to_string(), token.to_string());
        }
        let authorization = self.signer.authorization(
            &credentials,
            "POST",
            &self.endpoint,
            &headers,
            &payload_hash,
            now,
        )?;

        debug!(operation = %operation, endpoint = %self.endpoint, "Calling ACM Private CA");

        let mut request =
            self.client.post(self.endpoint.clone()).header("authorization", authorization);
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&body)
                .map_err(|e| AwsError::MalformedResponse(format!("{}: {}", operation, e)));
        }
        Err(service_error(status.as_u16(), &body))
    }

    async fn get_certificate(
        &self,
        authority: &AuthorityRef,
        handle: &CertificateHandle,
    ) -> Result<IssuedCertificate, AwsError> {
        let request = GetCertificateRequest {
            certificate_authority_arn: authority.as_str(),
            certificate_arn: handle.as_str(),
        };
        let value = self.call("GetCertificate", &request).await?;
        serde_json::from_value(value)
            .map_err(|e| AwsError::MalformedResponse(format!("GetCertificate: {}", e)))
    }
}

/// Decode a JSON 1.1 error body. `__type` may carry a namespace prefix
/// ending in `#`.
fn service_error(status: u16, body: &[u8]) -> AwsError {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let code = value
        .get("__type")
        .and_then(Value::as_str)
        .map(|kind| kind.rsplit('#').next().unwrap_or(kind))
        .unwrap_or("Unknown")
        .to_string();
    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    AwsError::Service { status, code, message }
}

#[async_trait]
impl CaProvider for AcmPcaClient {
    #[instrument(skip_all, fields(authority = %authority))]
    async fn submit(
        &self,
        authority: &AuthorityRef,
        csr_pem: &[u8],
        signing_algorithm: &str,
        validity_days: u32,
    ) -> Result<CertificateHandle, ProviderError> {
        let request = IssueCertificateRequest {
            certificate_authority_arn: authority.as_str(),
            csr: STANDARD.encode(csr_pem),
            signing_algorithm,
            validity: Validity { value: validity_days, kind: "DAYS" },
        };

        match self.call("IssueCertificate", &request).await {
            Ok(value) => {
                let response: IssueCertificateResponse = serde_json::from_value(value)
                    .map_err(|e| AwsError::MalformedResponse(format!("IssueCertificate: {}", e)))?;
                Ok(CertificateHandle::new(response.certificate_arn))
            }
            Err(AwsError::Service { status, code, message }) if (400..500).contains(&status) => {
                Err(ProviderError::Rejected(format!("{}: {}", code, message)))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(authority = %authority, handle = %handle))]
    async fn issuance_status(
        &self,
        authority: &AuthorityRef,
        handle: &CertificateHandle,
    ) -> Result<IssuanceStatus, ProviderError> {
        match self.get_certificate(authority, handle).await {
            Ok(_) => Ok(IssuanceStatus::Issued),
            Err(e) if e.service_code() == Some(REQUEST_IN_PROGRESS) => Ok(IssuanceStatus::Pending),
            Err(AwsError::Service { code, message, .. }) if code == REQUEST_FAILED => {
                Ok(IssuanceStatus::Failed(message))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(authority = %authority, handle = %handle))]
    async fn fetch(
        &self,
        authority: &AuthorityRef,
        handle: &CertificateHandle,
    ) -> Result<IssuedCertificate, ProviderError> {
        Ok(self.get_certificate(authority, handle).await?)
    }
}
