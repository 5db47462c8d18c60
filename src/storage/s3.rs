//! S3 `GetObject` over signed HTTPS.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{ObjectStore, ObjectStoreError};
use crate::aws::{self, amz_date, sha256_hex, uri_encode, AwsError, ProvideCredentials, Signer};

const SERVICE: &str = "s3";

/// `<Error>` document returned with non-2xx responses
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct S3ErrorDocument {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl S3ErrorDocument {
    fn parse(body: &str) -> Self {
        quick_xml::de::from_str(body).unwrap_or_default()
    }
}

pub struct S3ObjectStore {
    client: Client,
    credentials: Arc<dyn ProvideCredentials>,
    signer: Signer,
    region: String,
    /// Path-style base URL when talking to an emulator or private endpoint
    endpoint: Option<Url>,
}

impl S3ObjectStore {
    pub fn new(
        client: Client,
        credentials: Arc<dyn ProvideCredentials>,
        region: impl Into<String>,
        endpoint: Option<&str>,
    ) -> Result<Self, AwsError> {
        let region = region.into();
        let endpoint = endpoint.map(aws::parse_endpoint).transpose()?;
        Ok(Self { client, credentials, signer: Signer::new(region.clone(), SERVICE), region, endpoint })
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, AwsError> {
        let key = uri_encode(key.trim_start_matches('/'), true);
        let raw = match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.as_str().trim_end_matches('/'),
                uri_encode(bucket, false),
                key
            ),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key),
        };
        Url::parse(&raw).map_err(|e| AwsError::InvalidEndpoint { endpoint: raw.clone(), reason: e.to_string() })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError> {
        let url = self.object_url(bucket, key)?;
        let credentials = self.credentials.provide_credentials().await?;
        let now = Utc::now();
        let payload_hash = sha256_hex(b"");

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), aws::host_header(&url)?);
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        headers.insert("x-amz-date".to_string(), amz_date(now));
        if let Some(token) = credentials.session_token() {
            headers.insert("x-amz-security-token".to_string(), token.to_string());
        }
        let authorization =
            self.signer.authorization(&credentials, "GET", &url, &headers, &payload_hash, now)?;

        debug!(bucket = %bucket, key = %key, url = %url, "Fetching object from S3");

        let mut request = self.client.get(url.clone()).header("authorization", authorization);
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(AwsError::Http)?;
        let status = response.status();
        match status {
            StatusCode::OK => Ok(response.bytes().await.map_err(AwsError::Http)?),
            StatusCode::NOT_FOUND => {
                Err(ObjectStoreError::NotFound { bucket: bucket.to_string(), key: key.to_string() })
            }
            StatusCode::FORBIDDEN => Err(ObjectStoreError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let document = S3ErrorDocument::parse(&body);
                Err(AwsError::Service {
                    status: status.as_u16(),
                    code: document.code.unwrap_or_else(|| "Unknown".to_string()),
                    message: document.message.unwrap_or_default(),
                }
                .into())
            }
        }
    }
}
