//! Extractor trait, the first stage of a run

use crate::model::RunContext;
use eyre::Result;

/// Extractor trait for producing a batch and staging it
///
/// The returned value is the handle the next stage uses to find the batch.
/// Implementors must make re-extraction for the same logical date overwrite
/// the previous output rather than add to it.
///
/// # Example
/// ```no_run
/// use etl_node::etl::Extractor;
/// use etl_node::model::{BatchHandle, RunContext};
/// use eyre::Result;
///
/// struct FixedExtractor;
///
/// impl Extractor for FixedExtractor {
///     type Output = BatchHandle;
///
///     async fn extract(&self, run: &RunContext) -> Result<Self::Output> {
///         Ok(BatchHandle::for_date(run.logical_date))
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// Handle to the staged batch
    type Output: Send + Sync;

    /// Extract a batch for the run's logical date
    ///
    /// # Errors
    /// Returns an error if the batch cannot be staged
    fn extract(
        &self,
        run: &RunContext,
    ) -> impl std::future::Future<Output = Result<Self::Output>> + Send;
}
