//! # Issuance Orchestrator
//!
//! Drives one CSR through the provider: submit, poll on a fixed cadence until
//! issued or the ceiling passes, then fetch the certificate and chain.
//!
//! ```text
//! Submitted ──► Polling ──► Issued ──► (fetch)
//!     │            ├──────► TimedOut
//!     │            └──────► Failed
//!     └──► RejectedBySubmit
//! ```
//!
//! Every provider call happens at most once per step; nothing is retried and
//! nothing is cached.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::provider::{
    CaProvider, IssuanceStatus, IssuedCertificate, ProviderError, SIGNING_ALGORITHM, VALIDITY_DAYS,
};
use crate::domain::{AuthorityRef, CaName, CertificateHandle, SigningRequest};
use crate::errors::Error;
use crate::observability::metrics;

/// Delay between status checks
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Ceiling on the total wait for issuance
pub const ISSUANCE_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self { poll_interval: POLL_INTERVAL, timeout: ISSUANCE_TIMEOUT }
    }
}

impl WaitPolicy {
    /// Upper bound on status checks, the first one immediate. The deadline
    /// usually ends the wait sooner when checks are slow.
    pub fn max_attempts(&self) -> u32 {
        if self.poll_interval.is_zero() {
            return 1;
        }
        let attempts = self.timeout.as_millis() / self.poll_interval.as_millis();
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error("Certificate authority {authority} rejected the signing request: {reason}")]
    Rejected { authority: AuthorityRef, reason: String },

    #[error("Timed out waiting for certificate {handle} from {authority}")]
    TimedOut { handle: CertificateHandle, authority: AuthorityRef },

    #[error("Issuance of certificate {handle} from {authority} failed: {reason}")]
    Failed { handle: CertificateHandle, authority: AuthorityRef, reason: String },

    #[error("Could not fetch certificate {handle} from {authority}")]
    FetchFailed {
        handle: CertificateHandle,
        authority: AuthorityRef,
        #[source]
        source: ProviderError,
    },
}

impl IssuanceError {
    fn outcome(&self) -> &'static str {
        match self {
            IssuanceError::Rejected { .. } => "rejected",
            IssuanceError::TimedOut { .. } => "timed_out",
            IssuanceError::Failed { .. } => "failed",
            IssuanceError::FetchFailed { .. } => "fetch_failed",
        }
    }
}

impl From<IssuanceError> for Error {
    fn from(error: IssuanceError) -> Self {
        Error::upstream("Certificate issuance failed", error)
    }
}

/// Where a single issuance currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceState {
    Submitted { handle: CertificateHandle },
    Polling { handle: CertificateHandle, attempts: u32 },
    Issued { handle: CertificateHandle },
    TimedOut { handle: CertificateHandle },
    Failed { handle: CertificateHandle, reason: String },
    RejectedBySubmit { reason: String },
}

impl IssuanceState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IssuanceState::Submitted { .. } | IssuanceState::Polling { .. })
    }
}

pub struct IssuanceOrchestrator {
    provider: Arc<dyn CaProvider>,
    clock: Arc<dyn Clock>,
    policy: WaitPolicy,
}

impl IssuanceOrchestrator {
    pub fn new(provider: Arc<dyn CaProvider>) -> Self {
        Self::with_clock(provider, Arc::new(SystemClock), WaitPolicy::default())
    }

    pub fn with_clock(provider: Arc<dyn CaProvider>, clock: Arc<dyn Clock>, policy: WaitPolicy) -> Self {
        Self { provider, clock, policy }
    }

    /// Issue a certificate for `request` from `authority` and return the
    /// provider's output unchanged.
    #[instrument(skip_all, fields(ca = %ca_name, authority = %authority, common_name = %request.common_name()))]
    pub async fn issue(
        &self,
        ca_name: &CaName,
        authority: &AuthorityRef,
        request: &SigningRequest,
    ) -> Result<IssuedCertificate, IssuanceError> {
        let result = self.run(ca_name, authority, request).await;
        match &result {
            Ok(_) => metrics::record_issuance(ca_name.as_str(), "issued"),
            Err(e) => metrics::record_issuance(ca_name.as_str(), e.outcome()),
        }
        result
    }

    async fn run(
        &self,
        ca_name: &CaName,
        authority: &AuthorityRef,
        request: &SigningRequest,
    ) -> Result<IssuedCertificate, IssuanceError> {
        let mut state = match self
            .provider
            .submit(authority, request.pem(), SIGNING_ALGORITHM, VALIDITY_DAYS)
            .await
        {
            Ok(handle) => {
                info!(handle = %handle, authority = %authority, "Signing request submitted");
                IssuanceState::Submitted { handle }
            }
            Err(e) => IssuanceState::RejectedBySubmit { reason: e.to_string() },
        };

        let started = self.clock.now();
        let deadline = started + self.policy.timeout;
        while !state.is_terminal() {
            state = self.step(authority, state, deadline).await;
        }
        let waited = self.clock.now().saturating_duration_since(started);

        match state {
            IssuanceState::Issued { handle } => {
                metrics::record_issuance_wait(ca_name.as_str(), waited.as_secs_f64());
                debug!(handle = %handle, waited_ms = waited.as_millis() as u64, "Certificate issued");
                self.provider.fetch(authority, &handle).await.map_err(|source| {
                    error!(handle = %handle, authority = %authority, error = %source, "Fetching issued certificate failed");
                    IssuanceError::FetchFailed { handle, authority: authority.clone(), source }
                })
            }
            IssuanceState::TimedOut { handle } => {
                error!(
                    handle = %handle,
                    authority = %authority,
                    waited_secs = waited.as_secs(),
                    "Timed out waiting for certificate to be issued"
                );
                Err(IssuanceError::TimedOut { handle, authority: authority.clone() })
            }
            IssuanceState::Failed { handle, reason } => {
                error!(handle = %handle, authority = %authority, reason = %reason, "Certificate issuance failed");
                Err(IssuanceError::Failed { handle, authority: authority.clone(), reason })
            }
            IssuanceState::RejectedBySubmit { reason } => {
                error!(authority = %authority, reason = %reason, "Signing request rejected on submit");
                Err(IssuanceError::Rejected { authority: authority.clone(), reason })
            }
            // unreachable: the loop above only exits on a terminal state
            IssuanceState::Submitted { handle } | IssuanceState::Polling { handle, .. } => {
                Err(IssuanceError::Failed {
                    handle,
                    authority: authority.clone(),
                    reason: "wait ended before a terminal state".to_string(),
                })
            }
        }
    }

    /// Advance one non-terminal state by a single status check or sleep.
    ///
    /// Neither a sleep nor a status check may run past `deadline`.
    async fn step(&self, authority: &AuthorityRef, state: IssuanceState, deadline: Instant) -> IssuanceState {
        match state {
            IssuanceState::Submitted { handle } => IssuanceState::Polling { handle, attempts: 0 },
            IssuanceState::Polling { handle, attempts } => {
                if attempts > 0 {
                    let remaining = deadline.saturating_duration_since(self.clock.now());
                    if remaining.is_zero() {
                        return IssuanceState::TimedOut { handle };
                    }
                    self.clock.sleep(self.policy.poll_interval.min(remaining)).await;
                }

                let remaining = deadline.saturating_duration_since(self.clock.now());
                if remaining.is_zero() {
                    return IssuanceState::TimedOut { handle };
                }

                let attempts = attempts + 1;
                let status = tokio::select! {
                    biased;
                    status = self.provider.issuance_status(authority, &handle) => Some(status),
                    _ = self.clock.sleep(remaining) => None,
                };

                match status {
                    None => {
                        warn!(handle = %handle, attempts, "Status check still running at the issuance deadline");
                        IssuanceState::TimedOut { handle }
                    }
                    Some(Ok(IssuanceStatus::Issued)) => IssuanceState::Issued { handle },
                    Some(Ok(IssuanceStatus::Failed(reason))) => IssuanceState::Failed { handle, reason },
                    Some(Ok(IssuanceStatus::Pending))
                        if attempts >= self.policy.max_attempts() || self.clock.now() >= deadline =>
                    {
                        IssuanceState::TimedOut { handle }
                    }
                    Some(Ok(IssuanceStatus::Pending)) => {
                        debug!(handle = %handle, attempts, "Certificate not issued yet");
                        IssuanceState::Polling { handle, attempts }
                    }
                    Some(Err(e)) => {
                        warn!(handle = %handle, error = %e, "Issuance status check failed");
                        IssuanceState::Failed { handle, reason: e.to_string() }
                    }
                }
            }
            terminal => terminal,
        }
    }
}
