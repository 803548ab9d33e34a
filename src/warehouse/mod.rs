//! Relational store for raw rows and mart aggregates
//!
//! Two tables are involved:
//! - `raw.sample_data`: append-only copies of staged records
//! - `mart.aggregated_data`: append-only metric history
//!
//! Backends: NDJSON files, process memory, and PostgreSQL (feature `postgres`).

mod file;
mod memory;
mod ndjson;
#[cfg(feature = "postgres")]
mod postgres;

pub use file::NdjsonWarehouse;
pub use memory::MemoryWarehouse;
pub use ndjson::{NdjsonReader, NdjsonWriter};
#[cfg(feature = "postgres")]
pub use postgres::PostgresWarehouse;

use crate::error::EtlError;
use crate::model::{AggregateRow, RawRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Outcome of [`Warehouse::insert_raw_batch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchInsert {
    /// This call committed the rows
    Inserted(usize),
    /// The batch was committed earlier with this many rows; nothing was
    /// inserted
    AlreadyLoaded(usize),
}

impl BatchInsert {
    /// Rows of the batch present in the raw table
    pub fn rows(&self) -> usize {
        match self {
            Self::Inserted(n) | Self::AlreadyLoaded(n) => *n,
        }
    }
}

/// Rows already committed for `batch_key`
fn batch_rows(rows: &[RawRow], batch_key: &str) -> usize {
    rows.iter()
        .filter(|row| row.batch_key.as_deref() == Some(batch_key))
        .count()
}

/// Warehouse operations the pipeline needs
///
/// `created_at` and `aggregated_at` are assigned by the store at write time.
/// Nothing here updates or deletes existing rows.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Create schemas and tables if they do not exist
    async fn ensure_schema(&self) -> Result<(), EtlError>;

    /// Append one raw row
    async fn insert_raw(&self, data: &Value) -> Result<RawRow, EtlError>;

    /// Append all rows of the batch `batch_key` or none of them
    ///
    /// A batch key that was committed before is not inserted again, so
    /// retrying a batch after a later failure does not duplicate its rows.
    async fn insert_raw_batch(
        &self,
        batch_key: &str,
        rows: &[Value],
    ) -> Result<BatchInsert, EtlError>;

    /// Count raw rows created at or after `since` and append the count as
    /// `metric_name`
    async fn append_count_since(
        &self,
        metric_name: &str,
        since: DateTime<Utc>,
    ) -> Result<AggregateRow, EtlError>;

    /// Total number of raw rows
    async fn raw_count(&self) -> Result<u64, EtlError>;

    /// Most recent aggregate rows, newest first
    async fn recent_aggregates(&self, limit: usize) -> Result<Vec<AggregateRow>, EtlError>;

    /// Short description for log lines
    fn describe(&self) -> String;
}
