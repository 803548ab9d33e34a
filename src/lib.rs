//! ETL Node
//!
//! A daily ETL pipeline: a synthetic batch is staged in object storage, loaded
//! into a raw warehouse table, and aggregated into a mart table.

pub mod cli;
pub mod config;
pub mod error;
pub mod etl;
pub mod hook;
pub mod model;
pub mod schedule;
pub mod stages;
pub mod staging;
pub mod warehouse;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use error::{EtlError, classify};
pub use etl::{Aggregator, Extractor, Loader, Pipeline, RetryPolicy, RunReport, Transformer};
pub use model::{AggregateRow, BatchHandle, ProcessedMarker, RawRow, Record, RunContext};
pub use stages::{LoadMode, RecordCountAggregator, SampleExtractor, SampleLoader, WindowMode};
pub use staging::{DirectoryStore, MemoryStore, StagingStore};
pub use warehouse::{MemoryWarehouse, NdjsonWarehouse, Warehouse};
