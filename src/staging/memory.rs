//! In-memory staging store for tests and dry runs

use super::StagingStore;
use crate::error::EtlError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Staging store held in process memory
///
/// Clones share the same objects. [`MemoryStore::set_available`] simulates an
/// outage: every call fails with `StorageUnavailable` until it is restored.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<(String, String), StoredObject>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Object stored under `bucket/key`, if any
    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of objects in `bucket`
    pub async fn count(&self, bucket: &str) -> usize {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }

    fn check_available(&self, bucket: &str, key: &str) -> Result<(), EtlError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EtlError::storage(bucket, key, "store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl StagingStore for MemoryStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), EtlError> {
        self.check_available(bucket, key)?;
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EtlError> {
        self.check_available(bucket, key)?;
        self.object(bucket, key)
            .await
            .map(|o| o.body)
            .ok_or_else(|| EtlError::storage(bucket, key, "no such key"))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
