//! # PCA Gatekeeper
//!
//! An HTTP front door to a set of private certificate authorities shared by
//! several tenant organizations. Tenants authenticate with HTTP Basic
//! credentials and may only obtain certificates for the common names on their
//! allow-list; anyone may download a CA's revocation list.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (axum) → Authenticator → CA Registry → Authorizer → Issuance Orchestrator → ACM PCA
//!                               CA Registry → CRL Retriever → S3
//! ```
//!
//! ## Core Components
//!
//! - **API**: `/healthcheck`, `/{ca}/crl`, `/{ca}/sign-certificate`
//! - **Auth**: constant-time credential checks and common-name allow-lists
//! - **PKI**: CRL pass-through and the bounded-wait issuance state machine
//! - **AWS**: SigV4-signed S3 and ACM Private CA clients

pub mod api;
pub mod auth;
pub mod aws;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod pki;
pub mod startup;
pub mod storage;

pub use config::{AppConfig, Environment};
pub use errors::{Error, Result};
pub use startup::Application;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
