//! # PKI Services
//!
//! CRL retrieval and certificate issuance on top of the storage and CA
//! provider seams.

pub mod acm;
pub mod clock;
pub mod crl;
pub mod issuance;
pub mod provider;

pub use acm::AcmPcaClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use crl::{CrlError, CrlRetriever, CRL_CONTENT_TYPE};
pub use issuance::{
    IssuanceError, IssuanceOrchestrator, IssuanceState, WaitPolicy, ISSUANCE_TIMEOUT, POLL_INTERVAL,
};
pub use provider::{
    CaProvider, IssuanceStatus, IssuedCertificate, ProviderError, SIGNING_ALGORITHM, VALIDITY_DAYS,
};
