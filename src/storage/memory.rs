//! In-process object store for tests and local development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ObjectStore, ObjectStoreError};

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Bytes>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object, replacing any existing body under the same key
    pub fn put(&self, bucket: impl Into<String>, key: impl Into<String>, body: impl Into<Bytes>) {
        let mut objects = match self.objects.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        objects.insert((bucket.into(), key.into()), body.into());
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError> {
        let objects = match self.objects.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        objects.get(&(bucket.to_string(), key.to_string())).cloned().ok_or_else(|| {
            ObjectStoreError::NotFound { bucket: bucket.to_string(), key: key.to_string() }
        })
    }
}
