//! Pipeline configuration
//!
//! Settings live in a YAML file (default `pipeline.yml`). Credentials are never
//! stored there; they come from the environment, usually via a `.env` file:
//!
//! - `STAGING_ENDPOINT`: S3 endpoint URL (overrides `staging.endpoint`)
//! - `STAGING_ACCESS_KEY` / `STAGING_SECRET_KEY`: S3 credentials
//! - `DATABASE_URL`: PostgreSQL connection string
//!
//! Example format:
//! ```yaml
//! staging:
//!   backend: s3
//!   endpoint: http://minio:9000
//!   region: us-east-1
//!   raw_bucket: raw-data
//!   processed_bucket: processed-data
//! warehouse:
//!   backend: postgres
//! extract:
//!   batch_size: 10
//! load:
//!   mode: append
//! aggregate:
//!   metric_name: total_records
//!   window: wall_clock
//! retry:
//!   retries: 1
//!   delay: 5m
//! post_run:
//!   command: dbt run --profiles-dir /opt/dbt
//! ```

use crate::error::EtlError;
use crate::etl::RetryPolicy;
use crate::hook::PostRunHook;
use crate::stages::{LoadMode, WindowMode};
use crate::staging::{DirectoryStore, MemoryStore, StagingStore};
use crate::warehouse::{MemoryWarehouse, NdjsonWarehouse, Warehouse};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub staging: StagingConfig,
    pub warehouse: WarehouseConfig,
    pub extract: ExtractConfig,
    pub load: LoadConfig,
    pub aggregate: AggregateConfig,
    pub retry: RetryPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_run: Option<PostRunHook>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingBackend {
    #[default]
    Directory,
    Memory,
    S3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub backend: StagingBackend,
    /// Root directory for the `directory` backend
    pub root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub region: String,
    #[serde(skip_serializing)]
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    pub raw_bucket: String,
    pub processed_bucket: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            backend: StagingBackend::default(),
            root: PathBuf::from("staging"),
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
            raw_bucket: "raw-data".to_string(),
            processed_bucket: "processed-data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseBackend {
    #[default]
    Ndjson,
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub backend: WarehouseBackend,
    /// Root directory for the `ndjson` backend
    pub root: PathBuf,
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            backend: WarehouseBackend::default(),
            root: PathBuf::from("warehouse"),
            url: None,
            max_connections: 5,
        }
    }
}

/// Largest batch the extractor will generate
pub const MAX_BATCH_SIZE: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub batch_size: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub mode: LoadMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub metric_name: String,
    pub window: WindowMode,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            metric_name: "total_records".to_string(),
            window: WindowMode::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a config from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse pipeline config YAML")
    }

    /// Read a config file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Write the config as YAML; credentials are never written
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Load the config for a run
    ///
    /// Reads `path` if it exists (defaults otherwise), resolves relative
    /// directories against the file's directory, applies environment
    /// overrides, and validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            log::debug!("Loading config from {}", path.display());
            Self::read(path)?
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Make relative storage roots relative to `base`
    pub fn resolve_paths(&mut self, base: impl AsRef<Path>) {
        let base = base.as_ref();
        if self.staging.root.is_relative() {
            self.staging.root = base.join(&self.staging.root);
        }
        if self.warehouse.root.is_relative() {
            self.warehouse.root = base.join(&self.warehouse.root);
        }
    }

    /// Fill credentials and endpoints from an environment lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("STAGING_ENDPOINT") {
            self.staging.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup("STAGING_ACCESS_KEY") {
            self.staging.access_key = Some(key);
        }
        if let Some(secret) = lookup("STAGING_SECRET_KEY") {
            self.staging.secret_key = Some(secret);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.warehouse.url = Some(url);
        }
    }

    /// Check that the selected backends have what they need
    pub fn validate(&self) -> Result<(), EtlError> {
        if self.staging.raw_bucket.is_empty() || self.staging.processed_bucket.is_empty() {
            return Err(EtlError::config("staging bucket names must not be empty"));
        }
        if self.staging.raw_bucket == self.staging.processed_bucket {
            return Err(EtlError::config(
                "raw_bucket and processed_bucket must be different",
            ));
        }
        if self.extract.batch_size > MAX_BATCH_SIZE {
            return Err(EtlError::config(format!(
                "extract.batch_size must be at most {}",
                MAX_BATCH_SIZE
            )));
        }
        if self.aggregate.metric_name.is_empty() {
            return Err(EtlError::config("aggregate.metric_name must not be empty"));
        }

        if self.staging.backend == StagingBackend::S3 {
            let endpoint = self
                .staging
                .endpoint
                .as_deref()
                .ok_or_else(|| EtlError::config("S3 staging requires STAGING_ENDPOINT"))?;
            Url::parse(endpoint)
                .map_err(|e| EtlError::config(format!("invalid staging endpoint: {}", e)))?;
            if self.staging.access_key.is_none() || self.staging.secret_key.is_none() {
                return Err(EtlError::config(
                    "S3 staging requires STAGING_ACCESS_KEY and STAGING_SECRET_KEY",
                ));
            }
        }

        if self.warehouse.backend == WarehouseBackend::Postgres && self.warehouse.url.is_none() {
            return Err(EtlError::config("postgres warehouse requires DATABASE_URL"));
        }

        Ok(())
    }
}

impl StagingConfig {
    /// Build a staging client from this configuration
    pub fn open(&self) -> Result<Arc<dyn StagingStore>, EtlError> {
        match self.backend {
            StagingBackend::Directory => Ok(Arc::new(DirectoryStore::new(&self.root))),
            StagingBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StagingBackend::S3 => self.open_s3(),
        }
    }

    #[cfg(feature = "s3")]
    fn open_s3(&self) -> Result<Arc<dyn StagingStore>, EtlError> {
        let (Some(endpoint), Some(access_key), Some(secret_key)) = (
            self.endpoint.as_deref(),
            self.access_key.as_deref(),
            self.secret_key.as_deref(),
        ) else {
            return Err(EtlError::config(
                "S3 staging requires an endpoint and credentials",
            ));
        };
        Ok(Arc::new(crate::staging::S3Store::new(
            endpoint,
            &self.region,
            access_key,
            secret_key,
        )))
    }

    #[cfg(not(feature = "s3"))]
    fn open_s3(&self) -> Result<Arc<dyn StagingStore>, EtlError> {
        Err(EtlError::config(
            "S3 staging needs a build with the `s3` feature",
        ))
    }
}

impl WarehouseConfig {
    /// Connect to the configured warehouse
    pub async fn open(&self) -> Result<Arc<dyn Warehouse>, EtlError> {
        match self.backend {
            WarehouseBackend::Ndjson => Ok(Arc::new(NdjsonWarehouse::new(&self.root))),
            WarehouseBackend::Memory => Ok(Arc::new(MemoryWarehouse::new())),
            WarehouseBackend::Postgres => self.open_postgres().await,
        }
    }

    #[cfg(feature = "postgres")]
    async fn open_postgres(&self) -> Result<Arc<dyn Warehouse>, EtlError> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| EtlError::config("postgres warehouse requires DATABASE_URL"))?;
        let warehouse =
            crate::warehouse::PostgresWarehouse::connect(url, self.max_connections).await?;
        Ok(Arc::new(warehouse))
    }

    #[cfg(not(feature = "postgres"))]
    async fn open_postgres(&self) -> Result<Arc<dyn Warehouse>, EtlError> {
        Err(EtlError::config(
            "postgres warehouse needs a build with the `postgres` feature",
        ))
    }
}
