//! Synthetic batch extractor

use crate::etl::Extractor;
use crate::model::{BatchHandle, Record, RunContext};
use crate::staging::{JSON_CONTENT_TYPE, StagingStore, json_body};
use chrono::NaiveTime;
use eyre::Result;
use std::sync::Arc;

/// Generates `batch_size` records and stages them as one JSON array
///
/// Records are a pure function of the logical date, and the staging key is
/// derived from it too, so extracting the same date twice leaves the same
/// single object behind.
pub struct SampleExtractor {
    staging: Arc<dyn StagingStore>,
    bucket: String,
    batch_size: usize,
}

impl SampleExtractor {
    /// # Arguments
    /// * `staging` - Store to write the batch to
    /// * `bucket` - Bucket for raw batches (e.g. `raw-data`)
    /// * `batch_size` - Number of records per batch
    pub fn new(staging: Arc<dyn StagingStore>, bucket: impl Into<String>, batch_size: usize) -> Self {
        Self {
            staging,
            bucket: bucket.into(),
            batch_size,
        }
    }

    /// Records for one logical date
    pub fn generate(&self, run: &RunContext) -> Vec<Record> {
        let timestamp = run.logical_date.and_time(NaiveTime::MIN).and_utc();
        (1..=self.batch_size as u64)
            .map(|i| Record::synthetic(i, timestamp))
            .collect()
    }
}

impl Extractor for SampleExtractor {
    type Output = BatchHandle;

    async fn extract(&self, run: &RunContext) -> Result<Self::Output> {
        let records = self.generate(run);
        let handle = BatchHandle::for_date(run.logical_date);

        let body = json_body(&records, handle.key())?;

        self.staging
            .put(&self.bucket, handle.key(), body, JSON_CONTENT_TYPE)
            .await?;

        log::info!(
            "Staged {} record(s) to {}/{} ({})",
            records.len(),
            self.bucket,
            handle,
            self.staging.describe()
        );

        Ok(handle)
    }
}
