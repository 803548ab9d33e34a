//! Warehouse kept in NDJSON files

use super::{BatchInsert, NdjsonReader, NdjsonWriter, Warehouse, batch_rows};
use crate::error::EtlError;
use crate::model::{AggregateRow, RawRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Tables stored as NDJSON under a root directory
///
/// - `{root}/raw/sample_data.ndjson`
/// - `{root}/mart/aggregated_data.ndjson`
///
/// Writers within one process are serialized, and file I/O runs on the
/// blocking pool. A batch insert is a single append, so a batch is either
/// fully present or absent unless the write itself is cut short by the
/// operating system.
pub struct NdjsonWarehouse {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl NdjsonWarehouse {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.root.join("raw").join("sample_data.ndjson")
    }

    pub fn mart_path(&self) -> PathBuf {
        self.root.join("mart").join("aggregated_data.ndjson")
    }
}

/// Run file I/O on the blocking pool
async fn blocking<T, F>(op: F) -> Result<T, EtlError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EtlError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| EtlError::write(format!("file task failed: {}", e)))?
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, EtlError> {
    NdjsonReader::new(path)
        .read()
        .map_err(|e| EtlError::query(format!("{:#}", e)))
}

fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), EtlError> {
    NdjsonWriter::new(path)
        .append(rows)
        .map_err(|e| EtlError::write(format!("{:#}", e)))
}

#[async_trait]
impl Warehouse for NdjsonWarehouse {
    async fn ensure_schema(&self) -> Result<(), EtlError> {
        let _guard = self.write_lock.lock().await;
        let paths = [self.raw_path(), self.mart_path()];
        blocking(move || {
            for path in &paths {
                NdjsonWriter::new(path)
                    .touch()
                    .map_err(|e| EtlError::write(format!("{:#}", e)))?;
            }
            Ok(())
        })
        .await?;
        log::debug!("Warehouse tables ready under {}", self.root.display());
        Ok(())
    }

    async fn insert_raw(&self, data: &Value) -> Result<RawRow, EtlError> {
        let row = RawRow {
            data: data.clone(),
            created_at: Utc::now(),
            batch_key: None,
        };

        let _guard = self.write_lock.lock().await;
        let path = self.raw_path();
        let written = row.clone();
        blocking(move || append_rows(&path, &[written])).await?;

        Ok(row)
    }

    async fn insert_raw_batch(
        &self,
        batch_key: &str,
        rows: &[Value],
    ) -> Result<BatchInsert, EtlError> {
        let created_at = Utc::now();
        let rows: Vec<RawRow> = rows
            .iter()
            .map(|data| RawRow {
                data: data.clone(),
                created_at,
                batch_key: Some(batch_key.to_string()),
            })
            .collect();

        let _guard = self.write_lock.lock().await;
        let path = self.raw_path();
        let key = batch_key.to_string();
        blocking(move || {
            let existing: Vec<RawRow> = read_rows(&path)?;
            let loaded = batch_rows(&existing, &key);
            if loaded > 0 {
                return Ok(BatchInsert::AlreadyLoaded(loaded));
            }

            append_rows(&path, &rows)?;
            Ok(BatchInsert::Inserted(rows.len()))
        })
        .await
    }

    async fn append_count_since(
        &self,
        metric_name: &str,
        since: DateTime<Utc>,
    ) -> Result<AggregateRow, EtlError> {
        let _guard = self.write_lock.lock().await;
        let raw_path = self.raw_path();
        let mart_path = self.mart_path();
        let metric_name = metric_name.to_string();

        blocking(move || {
            let count = read_rows::<RawRow>(&raw_path)
                .map_err(|e| EtlError::write(e.to_string()))?
                .iter()
                .filter(|row| row.created_at >= since)
                .count();

            let row = AggregateRow {
                metric_name,
                metric_value: count as i64,
                aggregated_at: Utc::now(),
            };
            append_rows(&mart_path, std::slice::from_ref(&row))?;
            Ok(row)
        })
        .await
    }

    async fn raw_count(&self) -> Result<u64, EtlError> {
        let path = self.raw_path();
        blocking(move || {
            NdjsonReader::new(&path)
                .count()
                .map(|n| n as u64)
                .map_err(|e| EtlError::query(format!("{:#}", e)))
        })
        .await
    }

    async fn recent_aggregates(&self, limit: usize) -> Result<Vec<AggregateRow>, EtlError> {
        let path = self.mart_path();
        let mut rows = blocking(move || read_rows::<AggregateRow>(&path)).await?;

        rows.reverse();
        rows.truncate(limit);
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("ndjson {}", self.root.display())
    }
}
