//! Request handlers for the gatekeeper endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument, warn};

use super::error::ApiError;
use super::routes::ApiState;
use crate::auth::AuthenticatedTenant;
use crate::domain::SigningRequest;
use crate::errors::Error;
use crate::pki::{IssuedCertificate, CRL_CONTENT_TYPE};

/// Liveness endpoint; no dependencies are consulted.
pub async fn healthcheck_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Serve the CA's current CRL exactly as published.
#[instrument(skip(state))]
pub async fn crl_handler(
    State(state): State<ApiState>,
    Path(ca_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let authority = state.registry.lookup(&ca_name)?;
    let crl = state.crl_retriever.retrieve(authority).await.map_err(Error::from)?;

    Ok(([(header::CONTENT_TYPE, CRL_CONTENT_TYPE)], crl))
}

/// Sign a PEM CSR with the named CA on behalf of the authenticated tenant.
///
/// Runs after basic authentication; then resolves the CA, parses the CSR,
/// checks the common name against the tenant's allow-list and only then
/// contacts the certificate authority.
#[instrument(skip(state, tenant, body), fields(tenant = %tenant.id()))]
pub async fn sign_certificate_handler(
    State(state): State<ApiState>,
    Path(ca_name): Path<String>,
    Extension(tenant): Extension<AuthenticatedTenant>,
    body: Bytes,
) -> Result<Json<IssuedCertificate>, ApiError> {
    let authority = state.registry.lookup(&ca_name)?;
    let request = SigningRequest::from_pem(body)?;
    let common_name = request.common_name();

    if !state.authorizer.authorize(tenant.id(), common_name).is_authorized() {
        warn!(common_name = %common_name, "common name not allowed for tenant");
        return Err(Error::forbidden(format!(
            "Tenant '{}' may not request certificates for '{}'",
            tenant.id(),
            common_name
        ))
        .into());
    }

    let authority_ref = state.registry.authority_ref(authority);
    let issued = state
        .issuer
        .issue(authority.name(), &authority_ref, &request)
        .await
        .map_err(Error::from)?;

    info!(common_name = %common_name, ca = %authority.name(), "certificate issued");
    Ok(Json(issued))
}
