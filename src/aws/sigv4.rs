//! AWS Signature Version 4 request signing.
//!
//! Only what the gatekeeper needs: header-based signing of requests whose
//! path has already been encoded with [`uri_encode`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use super::{AwsError, Credentials};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// `x-amz-date` header format
pub fn amz_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn sha256_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Percent-encode per the SigV4 rules: everything except `A-Z a-z 0-9 - _ . ~`,
/// optionally keeping `/`.
pub fn uri_encode(input: &str, keep_slash: bool) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b'/' if keep_slash => encoded.push('/'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AwsError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AwsError::InvalidSigningKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Signs requests for one service in one region. Credentials are passed per
/// request since role credentials rotate.
#[derive(Debug, Clone)]
pub struct Signer {
    region: String,
    service: String,
}

impl Signer {
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self { region: region.into(), service: service.into() }
    }

    fn scope(&self, time: DateTime<Utc>) -> String {
        format!("{}/{}/{}/aws4_request", time.format("%Y%m%d"), self.region, self.service)
    }

    pub(crate) fn signing_key(
        &self,
        credentials: &Credentials,
        time: DateTime<Utc>,
    ) -> Result<Vec<u8>, AwsError> {
        let secret = format!("AWS4{}", credentials.secret_access_key());
        let date = time.format("%Y%m%d").to_string();
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }

    /// Compute the `Authorization` header value.
    ///
    /// `headers` must already contain every header to be signed, including
    /// `host` and `x-amz-date` (whose value must correspond to `time`).
    pub fn authorization(
        &self,
        credentials: &Credentials,
        method: &str,
        url: &Url,
        headers: &BTreeMap<String, String>,
        payload_sha256: &str,
        time: DateTime<Utc>,
    ) -> Result<String, AwsError> {
        let canonical_headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(name, value)| {
                (name.to_ascii_lowercase(), value.split_whitespace().collect::<Vec<_>>().join(" "))
            })
            .collect();
        let signed_headers = canonical_headers.keys().cloned().collect::<Vec<_>>().join(";");

        let canonical_request = [
            method.to_string(),
            canonical_uri(url),
            canonical_query(url),
            canonical_headers
                .iter()
                .map(|(name, value)| format!("{}:{}\n", name, value))
                .collect::<String>(),
            signed_headers.clone(),
            payload_sha256.to_string(),
        ]
        .join("\n");

        let scope = self.scope(time);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date(time),
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signature = hex::encode(hmac_sha256(&self.signing_key(credentials, time)?, string_to_sign.as_bytes())?);

        Ok(format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            credentials.access_key_id(),
            scope,
            signed_headers,
            signature
        ))
    }
}

fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (uri_encode(&key, false), uri_encode(&value, false)))
        .collect();
    pairs.sort();
    pairs.into_iter().map(|(key, value)| format!("{}={}", key, value)).collect::<Vec<_>>().join("&")
}
