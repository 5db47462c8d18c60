//! # Error Handling
//!
//! Error types shared across the gatekeeper. Component-level errors (object
//! store, CA provider, CSR parsing) live next to their components and convert
//! into [`Error`] at the service boundary.

pub mod types;

pub use types::{Error, Result};
