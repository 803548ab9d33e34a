//! Data passed between pipeline stages and persisted by them

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Staging key of one extraction run, derived from the logical date
///
/// Created by the extractor and handed to the loader unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchHandle(String);

impl BatchHandle {
    /// Handle for the batch extracted on `date`: `sample_data_<date>.json`
    pub fn for_date(date: NaiveDate) -> Self {
        Self(format!("sample_data_{}.json", date.format("%Y-%m-%d")))
    }

    /// Wrap an existing staging key
    pub fn from_key(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }

    /// Key of the processed marker for this batch
    pub fn processed_key(&self) -> String {
        format!("processed_{}", self.0)
    }
}

impl fmt::Display for BatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One synthetic source record, as generated by the extractor
///
/// The loader does not read batches back into this type: staged records are
/// loaded as whole JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// The `index`-th record of a batch (1-based), valued at ten times its id
    pub fn synthetic(index: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: index,
            value: i64::try_from(index)
                .unwrap_or(i64::MAX)
                .saturating_mul(10),
            timestamp,
        }
    }
}

/// A record as persisted in `raw.sample_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub data: Value,
    pub created_at: DateTime<Utc>,
    /// Staging key of the batch, for rows inserted as one transactional batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStatus {
    Processed,
}

/// Status object written to the processed bucket after a successful load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedMarker {
    pub status: MarkerStatus,
    pub records: usize,
}

impl ProcessedMarker {
    pub fn processed(records: usize) -> Self {
        Self {
            status: MarkerStatus::Processed,
            records,
        }
    }
}

/// One row of `mart.aggregated_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub metric_name: String,
    pub metric_value: i64,
    pub aggregated_at: DateTime<Utc>,
}

/// How a run was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Manual,
    Scheduled,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Identity of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub logical_date: NaiveDate,
    pub kind: RunKind,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(logical_date: NaiveDate, kind: RunKind) -> Self {
        Self {
            logical_date,
            kind,
            started_at: Utc::now(),
        }
    }

    pub fn manual(logical_date: NaiveDate) -> Self {
        Self::new(logical_date, RunKind::Manual)
    }

    pub fn scheduled(logical_date: NaiveDate) -> Self {
        Self::new(logical_date, RunKind::Scheduled)
    }

    /// Run id in the form `manual__2024-01-01`
    pub fn run_id(&self) -> String {
        format!("{}__{}", self.kind, self.logical_date.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_handle_for_date() {
        let handle = BatchHandle::for_date(date("2024-01-01"));
        assert_eq!(handle.key(), "sample_data_2024-01-01.json");
        assert_eq!(
            handle.processed_key(),
            "processed_sample_data_2024-01-01.json"
        );
    }

    #[test]
    fn test_synthetic_record() {
        let now = Utc::now();
        let record = Record::synthetic(3, now);
        assert_eq!(record.id, 3);
        assert_eq!(record.value, 30);
        assert_eq!(record.timestamp, now);
    }

    #[test]
    fn test_synthetic_value_saturates() {
        let record = Record::synthetic(u64::MAX, Utc::now());
        assert_eq!(record.value, i64::MAX);
    }

    #[test]
    fn test_marker_wire_format() {
        let marker = ProcessedMarker::processed(10);
        assert_eq!(
            serde_json::to_value(&marker).unwrap(),
            json!({"status": "processed", "records": 10})
        );
    }

    #[test]
    fn test_run_id() {
        let run = RunContext::scheduled(date("2024-01-01"));
        assert_eq!(run.run_id(), "scheduled__2024-01-01");
        assert_eq!(RunContext::manual(date("2024-01-02")).run_id(), "manual__2024-01-02");
    }
}
