//! Authentication and authorization module entry point.
//!
//! Tenants authenticate with HTTP Basic credentials checked against the
//! tenant directory; authorization is a per-tenant common-name allow-list.

pub mod authenticator;
pub mod authorizer;
pub mod middleware;

pub use authenticator::{AuthError, Authenticator};
pub use authorizer::{Authorizer, Decision};
pub use middleware::{require_basic_auth, AuthenticatedTenant};
