//! Loader trait, the second stage of a run

use crate::model::RunContext;
use eyre::Result;

/// Loader trait for moving a staged batch into the warehouse
///
/// Receives the extractor's output and returns a value for the aggregator,
/// typically the number of rows loaded.
///
/// # Example
/// ```no_run
/// use etl_node::etl::Loader;
/// use etl_node::model::{BatchHandle, RunContext};
/// use eyre::Result;
///
/// struct CountingLoader;
///
/// impl Loader for CountingLoader {
///     type Input = BatchHandle;
///     type Output = usize;
///
///     async fn load(&self, _run: &RunContext, handle: &BatchHandle) -> Result<usize> {
///         println!("would load {}", handle);
///         Ok(0)
///     }
/// }
/// ```
pub trait Loader: Send + Sync {
    /// The previous stage's output
    type Input: Send + Sync;

    /// Value handed to the next stage
    type Output: Send + Sync;

    /// Load the batch identified by `input`
    ///
    /// # Errors
    /// Returns an error if the batch cannot be read or written
    fn load(
        &self,
        run: &RunContext,
        input: &Self::Input,
    ) -> impl std::future::Future<Output = Result<Self::Output>> + Send;
}
