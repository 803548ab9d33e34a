//! The sample pipeline's stages
//!
//! - [`SampleExtractor`]: synthetic batch -> staging, returns a [`BatchHandle`]
//! - [`SampleLoader`]: staging -> `raw.sample_data`, writes a processed marker
//! - [`RecordCountAggregator`]: `raw.sample_data` -> `mart.aggregated_data`
//!
//! [`BatchHandle`]: crate::model::BatchHandle

mod aggregator;
mod extractor;
mod loader;

pub use aggregator::{RecordCountAggregator, WindowMode};
pub use extractor::SampleExtractor;
pub use loader::{LoadMode, SampleLoader};
