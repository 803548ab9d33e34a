//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the stage traits of a daily pipeline run and the
//! [`Pipeline`] driver that threads each stage's output into the next one.

mod aggregate;
mod extract;
mod load;
mod pipeline;
mod retry;
mod transform;

pub use aggregate::Aggregator;
pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::{Pipeline, RunReport, StageAttempts};
pub use retry::{RetryPolicy, Stage};
pub use transform::{REQUIRED_FIELDS, RecordValidator, Transformer};
