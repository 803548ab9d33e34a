//! S3-compatible staging store (MinIO)

use super::StagingStore;
use crate::error::EtlError;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;

/// Staging store backed by an S3 API endpoint
///
/// Uses path-style addressing so MinIO buckets resolve without DNS entries.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    endpoint: String,
}

impl S3Store {
    /// Build a client from explicit credentials
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "etl-node");
        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        log::debug!("Created S3 client for {}", endpoint);

        Self {
            client: Client::from_conf(config),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl StagingStore for S3Store {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), EtlError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| EtlError::storage(bucket, key, e))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EtlError> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| EtlError::storage(bucket, key, e))?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| EtlError::storage(bucket, key, e))?;

        Ok(body.into_bytes().to_vec())
    }

    fn describe(&self) -> String {
        format!("s3 {}", self.endpoint)
    }
}
