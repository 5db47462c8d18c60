//! # Object Storage
//!
//! Read-only access to the buckets holding each CA's published CRL.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;

pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

/// Errors from an object store backend
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("Object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("Access to s3://{bucket}/{key} denied")]
    AccessDenied { bucket: String, key: String },

    #[error("Object store backend error: {0}")]
    Backend(#[from] crate::aws::AwsError),
}

/// Fetches whole objects by bucket and key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Return the complete object body
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError>;
}
