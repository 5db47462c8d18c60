//! Axum middleware enforcing HTTP Basic authentication.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};
use tracing::{debug, field, info_span, warn, Instrument};

use super::authenticator::{AuthError, Authenticator};
use crate::api::error::ApiError;
use crate::domain::TenantId;
use crate::observability::metrics;

/// Request extension carrying the tenant that passed authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedTenant(pub TenantId);

impl AuthenticatedTenant {
    pub fn id(&self) -> &TenantId {
        &self.0
    }
}

/// Middleware entry point that authenticates requests against the tenant directory.
pub async fn require_basic_auth(
    State(authenticator): State<Authenticator>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let correlation_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "auth_middleware.require_basic_auth",
        http.method = %request.method(),
        http.path = %request.uri().path(),
        auth.tenant_id = field::Empty,
        correlation_id = %correlation_id
    );

    let outcome = match request.headers().typed_get::<Authorization<Basic>>() {
        Some(Authorization(basic)) => authenticator.authenticate(basic.username(), basic.password()),
        None => Err(AuthError::MissingCredentials),
    };

    match outcome {
        Ok(tenant_id) => {
            span.record("auth.tenant_id", field::display(&tenant_id));
            span.in_scope(|| debug!("tenant authenticated"));
            metrics::record_authentication("success");
            request.extensions_mut().insert(AuthenticatedTenant(tenant_id));
            Ok(next.run(request).instrument(span).await)
        }
        Err(err) => {
            span.in_scope(|| warn!(%correlation_id, error = %err, "authentication failed"));
            metrics::record_authentication("failure");
            Err(ApiError::from(err))
        }
    }
}
