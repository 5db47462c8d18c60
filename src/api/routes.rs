use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{crl_handler, healthcheck_handler, sign_certificate_handler};
use crate::auth::{require_basic_auth, Authenticator, Authorizer};
use crate::domain::CaRegistry;
use crate::pki::{CrlRetriever, IssuanceOrchestrator};

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<CaRegistry>,
    pub authorizer: Authorizer,
    pub crl_retriever: Arc<CrlRetriever>,
    pub issuer: Arc<IssuanceOrchestrator>,
}

/// Assemble the public router. Only the signing route requires credentials.
pub fn build_router(state: ApiState, authenticator: Authenticator, max_body_size: usize) -> Router {
    let signing = Router::new()
        .route("/{ca_name}/sign-certificate", post(sign_certificate_handler))
        .route_layer(middleware::from_fn_with_state(authenticator, require_basic_auth));

    Router::new()
        .route("/healthcheck", get(healthcheck_handler))
        .route("/{ca_name}/crl", get(crl_handler))
        .merge(signing)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
}
