//! In-memory warehouse for tests and dry runs

use super::{BatchInsert, Warehouse, batch_rows};
use crate::error::EtlError;
use crate::model::{AggregateRow, RawRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    raw: Vec<RawRow>,
    mart: Vec<AggregateRow>,
    /// Inserts left before the injected failure fires
    fail_after: Option<usize>,
    offline: bool,
}

/// Warehouse held in process memory
///
/// Clones share the same tables. Two faults can be injected:
/// - [`MemoryWarehouse::fail_after`] lets `n` more row inserts succeed, fails
///   the next insert once, then behaves normally again
/// - [`MemoryWarehouse::set_available`] fails every call until restored
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the insert that follows the next `inserts` successful ones
    pub async fn fail_after(&self, inserts: usize) {
        self.tables.write().await.fail_after = Some(inserts);
    }

    pub async fn set_available(&self, available: bool) {
        self.tables.write().await.offline = !available;
    }

    pub async fn raw_rows(&self) -> Vec<RawRow> {
        self.tables.read().await.raw.clone()
    }

    pub async fn aggregate_rows(&self) -> Vec<AggregateRow> {
        self.tables.read().await.mart.clone()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn ensure_schema(&self) -> Result<(), EtlError> {
        Ok(())
    }

    async fn insert_raw(&self, data: &Value) -> Result<RawRow, EtlError> {
        let mut tables = self.tables.write().await;
        if tables.offline {
            return Err(EtlError::write("warehouse is offline"));
        }

        match tables.fail_after {
            Some(0) => {
                tables.fail_after = None;
                return Err(EtlError::write("connection lost during insert"));
            }
            Some(n) => tables.fail_after = Some(n - 1),
            None => {}
        }

        let row = RawRow {
            data: data.clone(),
            created_at: Utc::now(),
            batch_key: None,
        };
        tables.raw.push(row.clone());
        Ok(row)
    }

    async fn insert_raw_batch(
        &self,
        batch_key: &str,
        rows: &[Value],
    ) -> Result<BatchInsert, EtlError> {
        let mut tables = self.tables.write().await;
        if tables.offline {
            return Err(EtlError::write("warehouse is offline"));
        }

        let loaded = batch_rows(&tables.raw, batch_key);
        if loaded > 0 {
            return Ok(BatchInsert::AlreadyLoaded(loaded));
        }

        if let Some(n) = tables.fail_after {
            if n < rows.len() {
                tables.fail_after = None;
                return Err(EtlError::write(
                    "connection lost during insert, transaction rolled back",
                ));
            }
            tables.fail_after = Some(n - rows.len());
        }

        let created_at = Utc::now();
        tables.raw.extend(rows.iter().map(|data| RawRow {
            data: data.clone(),
            created_at,
            batch_key: Some(batch_key.to_string()),
        }));
        Ok(BatchInsert::Inserted(rows.len()))
    }

    async fn append_count_since(
        &self,
        metric_name: &str,
        since: DateTime<Utc>,
    ) -> Result<AggregateRow, EtlError> {
        let mut tables = self.tables.write().await;
        if tables.offline {
            return Err(EtlError::write("warehouse is offline"));
        }

        let count = tables.raw.iter().filter(|r| r.created_at >= since).count();
        let row = AggregateRow {
            metric_name: metric_name.to_string(),
            metric_value: count as i64,
            aggregated_at: Utc::now(),
        };
        tables.mart.push(row.clone());
        Ok(row)
    }

    async fn raw_count(&self) -> Result<u64, EtlError> {
        let tables = self.tables.read().await;
        if tables.offline {
            return Err(EtlError::query("warehouse is offline"));
        }
        Ok(tables.raw.len() as u64)
    }

    async fn recent_aggregates(&self, limit: usize) -> Result<Vec<AggregateRow>, EtlError> {
        let tables = self.tables.read().await;
        if tables.offline {
            return Err(EtlError::query("warehouse is offline"));
        }
        Ok(tables.mart.iter().rev().take(limit).cloned().collect())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
