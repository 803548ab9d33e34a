//! Staged batch loader

use crate::error::EtlError;
use crate::etl::{Loader, RecordValidator, Transformer};
use crate::model::{BatchHandle, ProcessedMarker, RunContext};
use crate::staging::{JSON_CONTENT_TYPE, StagingStore, json_body};
use crate::warehouse::{BatchInsert, Warehouse};
use eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// How rows of one batch reach the raw table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// One insert per record; a retry after a partial failure duplicates the
    /// rows that made it in
    #[default]
    Append,
    /// The whole batch in one transaction, keyed by the batch handle so a
    /// retry never inserts the same batch twice
    Transactional,
}

/// Reads a staged batch, inserts it into `raw.sample_data`, and writes a
/// processed marker
///
/// The marker is only written after every row is in, so its presence means
/// the raw table is up to date for the batch.
pub struct SampleLoader {
    staging: Arc<dyn StagingStore>,
    warehouse: Arc<dyn Warehouse>,
    raw_bucket: String,
    processed_bucket: String,
    mode: LoadMode,
    transformer: RecordValidator,
}

impl SampleLoader {
    pub fn new(
        staging: Arc<dyn StagingStore>,
        warehouse: Arc<dyn Warehouse>,
        raw_bucket: impl Into<String>,
        processed_bucket: impl Into<String>,
    ) -> Self {
        Self {
            staging,
            warehouse,
            raw_bucket: raw_bucket.into(),
            processed_bucket: processed_bucket.into(),
            mode: LoadMode::default(),
            transformer: RecordValidator,
        }
    }

    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fetch the staged batch as raw JSON objects
    async fn fetch(&self, handle: &BatchHandle) -> Result<Vec<Map<String, Value>>> {
        let body = self.staging.get(&self.raw_bucket, handle.key()).await?;
        let records = serde_json::from_slice(&body)
            .map_err(|e| EtlError::deserialization(handle.key(), e))?;
        Ok(records)
    }
}

impl Loader for SampleLoader {
    type Input = BatchHandle;
    type Output = usize;

    async fn load(&self, _run: &RunContext, handle: &BatchHandle) -> Result<usize> {
        let records = self.fetch(handle).await?;
        log::debug!("Fetched {} record(s) from {}/{}", records.len(), self.raw_bucket, handle);

        let rows = self
            .transformer
            .transform_many(records)
            .map_err(|e| EtlError::deserialization(handle.key(), format!("{:#}", e)))?;

        match self.mode {
            LoadMode::Append => {
                for row in &rows {
                    self.warehouse.insert_raw(row).await?;
                }
            }
            LoadMode::Transactional => {
                let outcome = self.warehouse.insert_raw_batch(handle.key(), &rows).await?;
                if let BatchInsert::AlreadyLoaded(n) = outcome {
                    log::info!("{} was already loaded ({} row(s)), skipping insert", handle, n);
                }
            }
        }
        log::info!(
            "Loaded {} record(s) into raw.sample_data ({})",
            rows.len(),
            self.warehouse.describe()
        );

        let marker_key = handle.processed_key();
        let marker = json_body(&ProcessedMarker::processed(rows.len()), &marker_key)?;
        self.staging
            .put(&self.processed_bucket, &marker_key, marker, JSON_CONTENT_TYPE)
            .await?;
        log::debug!("Wrote marker {}/{}", self.processed_bucket, marker_key);

        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::staging::MemoryStore;
    use crate::warehouse::MemoryWarehouse;
    use chrono::NaiveDate;

    fn run() -> RunContext {
        RunContext::manual(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn loader(store: &MemoryStore, warehouse: &MemoryWarehouse) -> SampleLoader {
        SampleLoader::new(
            Arc::new(store.clone()),
            Arc::new(warehouse.clone()),
            "raw-data",
            "processed-data",
        )
    }

    #[tokio::test]
    async fn test_malformed_batch() {
        let store = MemoryStore::new();
        let warehouse = MemoryWarehouse::new();
        store
            .put("raw-data", "bad.json", b"{not json".to_vec(), JSON_CONTENT_TYPE)
            .await
            .unwrap();

        let err = loader(&store, &warehouse)
            .load(&run(), &BatchHandle::from_key("bad.json"))
            .await
            .unwrap_err();

        assert!(classify(&err).unwrap().is_deserialization());
        assert_eq!(warehouse.raw_count().await.unwrap(), 0);
        assert_eq!(store.count("processed-data").await, 0);
    }

    #[tokio::test]
    async fn test_staging_outage_loads_nothing() {
        let store = MemoryStore::new();
        let warehouse = MemoryWarehouse::new();
        store
            .put(
                "raw-data",
                "one.json",
                br#"[{"id":1,"value":10,"timestamp":"2024-01-01T00:00:00Z"}]"#.to_vec(),
                JSON_CONTENT_TYPE,
            )
            .await
            .unwrap();

        let loader = loader(&store, &warehouse);
        let handle = BatchHandle::from_key("one.json");
        let fetched = loader.fetch(&handle).await.unwrap();
        assert_eq!(fetched.len(), 1);

        store.set_available(false);
        let err = loader.load(&run(), &handle).await.unwrap_err();
        assert!(classify(&err).unwrap().is_storage());
        assert_eq!(warehouse.raw_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_loaded_verbatim() {
        let store = MemoryStore::new();
        let warehouse = MemoryWarehouse::new();
        let record = r#"{"id":1,"value":10,"timestamp":"2024-01-01T12:34:56.789012","region":"tokyo"}"#;
        store
            .put(
                "raw-data",
                "extra.json",
                format!("[{}]", record).into_bytes(),
                JSON_CONTENT_TYPE,
            )
            .await
            .unwrap();

        let loaded = loader(&store, &warehouse)
            .load(&run(), &BatchHandle::from_key("extra.json"))
            .await
            .unwrap();

        assert_eq!(loaded, 1);
        let rows = warehouse.raw_rows().await;
        assert_eq!(serde_json::to_string(&rows[0].data).unwrap(), record);
    }

    #[tokio::test]
    async fn test_record_missing_value_rejected() {
        let store = MemoryStore::new();
        let warehouse = MemoryWarehouse::new();
        store
            .put(
                "raw-data",
                "partial.json",
                br#"[{"id":1,"timestamp":"2024-01-01T00:00:00"}]"#.to_vec(),
                JSON_CONTENT_TYPE,
            )
            .await
            .unwrap();

        let err = loader(&store, &warehouse)
            .load(&run(), &BatchHandle::from_key("partial.json"))
            .await
            .unwrap_err();

        assert!(classify(&err).unwrap().is_deserialization());
        assert_eq!(warehouse.raw_count().await.unwrap(), 0);
    }

    #[test]
    fn test_load_mode_names() {
        let mode: LoadMode = serde_yaml::from_str("transactional").unwrap();
        assert_eq!(mode, LoadMode::Transactional);
        assert_eq!(LoadMode::default(), LoadMode::Append);
    }
}
