//! Object storage for batches in flight between stages
//!
//! This module provides the [`StagingStore`] abstraction plus:
//! - Directory-backed buckets on the local file system
//! - An in-memory store for tests and dry runs
//! - An S3-compatible store for MinIO (feature `s3`)

mod directory;
mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

use crate::error::EtlError;
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Serialize;

/// Content type of staged batches and markers
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Encode `value` as the JSON body of the object stored under `key`
pub fn json_body<T: Serialize + ?Sized>(value: &T, key: &str) -> Result<Vec<u8>> {
    serde_json::to_vec(value).with_context(|| format!("Failed to encode {} as JSON", key))
}

/// Key/value object storage organised in buckets
///
/// `put` overwrites an existing object with the same key. `get` on a missing
/// key fails with [`EtlError::StorageUnavailable`].
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Store `body` under `bucket/key`
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), EtlError>;

    /// Fetch the object stored under `bucket/key`
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EtlError>;

    /// Short description for log lines
    fn describe(&self) -> String;
}
