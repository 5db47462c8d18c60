//! AWS credentials and the sources they are resolved from.
//!
//! Clients hold an `Arc<dyn ProvideCredentials>` and ask it on every request,
//! so temporary credentials from a role are renewed before they expire.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AwsError;

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// Cached credentials are renewed this long before they expire
pub const REFRESH_BEFORE_EXPIRY_SECS: i64 = 300;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    #[zeroize(skip)]
    expiry: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiry: None,
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn from_env() -> Result<Self, AwsError> {
        let read = |name: &'static str| env_var(name).ok_or(AwsError::MissingCredentials(name));

        Ok(Self::new(
            read(ACCESS_KEY_ID_VAR)?,
            read(SECRET_ACCESS_KEY_VAR)?,
            env_var(SESSION_TOKEN_VAR),
        ))
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// True when the credentials lapse within `window` of `now`.
    /// Credentials without an expiry never do.
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expiry.is_some_and(|expiry| expiry - now <= window)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Non-empty value of an environment variable
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// A source of AWS credentials
#[async_trait]
pub trait ProvideCredentials: Send + Sync {
    async fn provide_credentials(&self) -> Result<Credentials, AwsError>;
}

/// Fixed credentials always resolve to themselves
#[async_trait]
impl ProvideCredentials for Credentials {
    async fn provide_credentials(&self) -> Result<Credentials, AwsError> {
        Ok(self.clone())
    }
}

/// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentCredentials;

#[async_trait]
impl ProvideCredentials for EnvironmentCredentials {
    async fn provide_credentials(&self) -> Result<Credentials, AwsError> {
        Credentials::from_env()
    }
}

/// Holds the last resolved credentials and asks the inner source again once
/// they come within [`REFRESH_BEFORE_EXPIRY_SECS`] of expiring.
pub struct CredentialsCache {
    provider: Arc<dyn ProvideCredentials>,
    cached: Mutex<Option<Credentials>>,
}

impl CredentialsCache {
    pub fn new(provider: Arc<dyn ProvideCredentials>) -> Self {
        Self { provider, cached: Mutex::new(None) }
    }
}

#[async_trait]
impl ProvideCredentials for CredentialsCache {
    async fn provide_credentials(&self) -> Result<Credentials, AwsError> {
        // held across the refresh so concurrent requests share one fetch
        let mut cached = self.cached.lock().await;
        let window = Duration::seconds(REFRESH_BEFORE_EXPIRY_SECS);
        if let Some(credentials) = cached.as_ref() {
            if !credentials.expires_within(Utc::now(), window) {
                return Ok(credentials.clone());
            }
            debug!(expiry = ?credentials.expiry(), "Refreshing AWS credentials");
        }

        let fresh = self.provider.provide_credentials().await?;
        debug!(access_key_id = %fresh.access_key_id(), expiry = ?fresh.expiry(), "Resolved AWS credentials");
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Hands out a new key id per call, expiring `lifetime` from now
    struct CountingProvider {
        calls: AtomicU32,
        lifetime: Option<Duration>,
    }

    impl CountingProvider {
        fn new(lifetime: Option<Duration>) -> Self {
            Self { calls: AtomicU32::new(0), lifetime }
        }
    }

    #[async_trait]
    impl ProvideCredentials for CountingProvider {
        async fn provide_credentials(&self) -> Result<Credentials, AwsError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let credentials = Credentials::new(format!("ASIA{}", call), "secret", Some("token".to_string()));
            Ok(match self.lifetime {
                Some(lifetime) => credentials.with_expiry(Utc::now() + lifetime),
                None => credentials,
            })
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credentials =
            Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI", Some("session".to_string()));
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("wJalrXUtnFEMI"));
        assert!(!rendered.contains("session\""));
    }

    #[test]
    fn test_expires_within() {
        let now = Utc::now();
        let window = Duration::minutes(5);
        let static_keys = Credentials::new("AKID", "secret", None);
        assert!(!static_keys.expires_within(now, window));

        let soon = static_keys.clone().with_expiry(now + Duration::minutes(4));
        assert!(soon.expires_within(now, window));

        let later = Credentials::new("AKID", "secret", None).with_expiry(now + Duration::hours(1));
        assert!(!later.expires_within(now, window));
    }

    #[tokio::test]
    async fn test_cache_reuses_long_lived_credentials() {
        let provider = Arc::new(CountingProvider::new(Some(Duration::hours(6))));
        let cache = CredentialsCache::new(provider.clone());

        let first = cache.provide_credentials().await.unwrap();
        let second = cache.provide_credentials().await.unwrap();
        assert_eq!(first.access_key_id(), "ASIA1");
        assert_eq!(second.access_key_id(), "ASIA1");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_refreshes_credentials_near_expiry() {
        let provider = Arc::new(CountingProvider::new(Some(Duration::minutes(2))));
        let cache = CredentialsCache::new(provider.clone());

        assert_eq!(cache.provide_credentials().await.unwrap().access_key_id(), "ASIA1");
        assert_eq!(cache.provide_credentials().await.unwrap().access_key_id(), "ASIA2");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_keeps_credentials_without_expiry() {
        let provider = Arc::new(CountingProvider::new(None));
        let cache = CredentialsCache::new(provider.clone());

        for _ in 0..3 {
            assert_eq!(cache.provide_credentials().await.unwrap().access_key_id(), "ASIA1");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
