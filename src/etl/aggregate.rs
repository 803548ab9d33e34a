//! Aggregator trait, the last stage of a run

use crate::model::RunContext;
use eyre::Result;

/// Aggregator trait for deriving summary metrics from loaded data
///
/// Aggregates are appended, never merged into earlier results.
pub trait Aggregator: Send + Sync {
    /// The previous stage's output
    type Input: Send + Sync;

    /// The appended aggregate
    type Output: Send + Sync;

    /// Compute and persist the aggregate for this run
    ///
    /// # Errors
    /// Returns an error if the aggregate cannot be written
    fn aggregate(
        &self,
        run: &RunContext,
        input: &Self::Input,
    ) -> impl std::future::Future<Output = Result<Self::Output>> + Send;
}
