//! Certificate signing requests submitted by tenants.

use bytes::Bytes;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

use crate::errors::Error;

const CSR_PEM_LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CsrError {
    #[error("request body is not PEM encoded")]
    NotPem,
    #[error("unexpected PEM block '{0}', expected a certificate request")]
    UnexpectedLabel(String),
    #[error("certificate request is not valid DER")]
    InvalidDer,
    #[error("certificate request subject has no common name")]
    MissingCommonName,
    #[error("certificate request common name is not a valid string")]
    InvalidCommonName,
}

impl From<CsrError> for Error {
    fn from(err: CsrError) -> Self {
        Error::validation_field(err.to_string(), "csr")
    }
}

/// A PEM-encoded CSR together with the common name read from its subject.
///
/// The raw bytes are forwarded to the CA provider untouched; the common name
/// is only used for the allow-list check.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pem: Bytes,
    common_name: String,
}

impl SigningRequest {
    /// Parse the body of a sign request. The first common name in the subject wins.
    pub fn from_pem(pem: Bytes) -> Result<Self, CsrError> {
        let (_, block) = parse_x509_pem(&pem).map_err(|_| CsrError::NotPem)?;
        if !CSR_PEM_LABELS.contains(&block.label.as_str()) {
            return Err(CsrError::UnexpectedLabel(block.label));
        }

        let (_, csr) = X509CertificationRequest::from_der(&block.contents)
            .map_err(|_| CsrError::InvalidDer)?;
        let common_name = csr
            .certification_request_info
            .subject
            .iter_common_name()
            .next()
            .ok_or(CsrError::MissingCommonName)?
            .as_str()
            .map_err(|_| CsrError::InvalidCommonName)?
            .to_string();

        Ok(Self { pem, common_name })
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    pub fn pem(&self) -> &Bytes {
        &self.pem
    }
}
