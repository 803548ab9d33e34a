//! Pipeline orchestration for ETL operations

use super::{Aggregator, Extractor, Loader, RetryPolicy, Stage};
use crate::hook::PostRunHook;
use crate::model::RunContext;
use chrono::{DateTime, Utc};
use eyre::Result;

/// ETL Pipeline that runs Extract, Load, and Aggregate stages in order
///
/// Each stage receives the previous stage's output by value handoff; no state
/// is shared between stages. A failing stage is retried according to the
/// [`RetryPolicy`]; once its attempts are exhausted the run halts and the
/// remaining stages are skipped.
///
/// # Type Parameters
/// - `E`: Extractor type
/// - `L`: Loader type (must consume `E::Output`)
/// - `A`: Aggregator type (must consume `L::Output`)
///
/// # Example
/// ```no_run
/// use etl_node::etl::{Pipeline, RetryPolicy};
/// # use etl_node::etl::{Aggregator, Extractor, Loader};
/// # use etl_node::model::RunContext;
/// # use eyre::Result;
/// # struct MyExtractor;
/// # impl Extractor for MyExtractor {
/// #     type Output = String;
/// #     async fn extract(&self, _run: &RunContext) -> Result<String> { Ok("key".into()) }
/// # }
/// # struct MyLoader;
/// # impl Loader for MyLoader {
/// #     type Input = String;
/// #     type Output = usize;
/// #     async fn load(&self, _run: &RunContext, _key: &String) -> Result<usize> { Ok(0) }
/// # }
/// # struct MyAggregator;
/// # impl Aggregator for MyAggregator {
/// #     type Input = usize;
/// #     type Output = i64;
/// #     async fn aggregate(&self, _run: &RunContext, n: &usize) -> Result<i64> { Ok(*n as i64) }
/// # }
///
/// # async fn example() -> Result<()> {
/// let pipeline = Pipeline::new(MyExtractor, MyLoader, MyAggregator)
///     .with_retry(RetryPolicy::default());
///
/// let run = RunContext::manual(chrono::Utc::now().date_naive());
/// let report = pipeline.run(&run).await?;
/// println!("Loaded {} records", report.loaded);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, L, A> {
    extractor: E,
    loader: L,
    aggregator: A,
    retry: RetryPolicy,
    post_run: Option<PostRunHook>,
}

/// How many attempts a stage needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageAttempts {
    pub stage: Stage,
    pub attempts: u32,
}

/// Outputs of a successful run
#[derive(Debug, Clone)]
pub struct RunReport<H, N, G> {
    pub run: RunContext,
    /// Extractor output
    pub batch: H,
    /// Loader output
    pub loaded: N,
    /// Aggregator output
    pub aggregate: G,
    pub attempts: Vec<StageAttempts>,
    /// `None` when no hook is configured
    pub post_run_succeeded: Option<bool>,
    pub finished_at: DateTime<Utc>,
}

impl<H, N, G> RunReport<H, N, G> {
    /// Attempts taken by `stage`
    pub fn attempts_for(&self, stage: Stage) -> u32 {
        self.attempts
            .iter()
            .find(|a| a.stage == stage)
            .map(|a| a.attempts)
            .unwrap_or(0)
    }
}

impl<E, L, A> Pipeline<E, L, A>
where
    E: Extractor,
    L: Loader<Input = E::Output>,
    A: Aggregator<Input = L::Output>,
{
    /// Create a new pipeline with the default retry policy
    pub fn new(extractor: E, loader: L, aggregator: A) -> Self {
        Self {
            extractor,
            loader,
            aggregator,
            retry: RetryPolicy::default(),
            post_run: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run `hook` after every successful run
    pub fn with_post_run(mut self, hook: Option<PostRunHook>) -> Self {
        self.post_run = hook;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run the complete pipeline for one logical date
    ///
    /// Steps:
    /// 1. Extract a batch into staging
    /// 2. Load the staged batch into the warehouse
    /// 3. Aggregate the loaded data into the mart
    /// 4. Run the post-run hook, if any
    ///
    /// # Errors
    /// Returns the error of the first stage that exhausts its retries
    pub async fn run(
        &self,
        run: &RunContext,
    ) -> Result<RunReport<E::Output, L::Output, A::Output>> {
        log::info!("Starting ETL pipeline run {}", run.run_id());
        let mut attempts = Vec::with_capacity(3);

        // Extract
        let extractor = &self.extractor;
        let (batch, n) = self
            .retry
            .run(Stage::Extract, move || extractor.extract(run))
            .await?;
        attempts.push(StageAttempts {
            stage: Stage::Extract,
            attempts: n,
        });
        log::debug!("{} finished after {} attempt(s)", Stage::Extract, n);

        // Load
        let loader = &self.loader;
        let batch_ref = &batch;
        let (loaded, n) = self
            .retry
            .run(Stage::Load, move || loader.load(run, batch_ref))
            .await?;
        attempts.push(StageAttempts {
            stage: Stage::Load,
            attempts: n,
        });
        log::debug!("{} finished after {} attempt(s)", Stage::Load, n);

        // Aggregate
        let aggregator = &self.aggregator;
        let loaded_ref = &loaded;
        let (aggregate, n) = self
            .retry
            .run(Stage::Aggregate, move || aggregator.aggregate(run, loaded_ref))
            .await?;
        attempts.push(StageAttempts {
            stage: Stage::Aggregate,
            attempts: n,
        });
        log::debug!("{} finished after {} attempt(s)", Stage::Aggregate, n);

        let post_run_succeeded = match &self.post_run {
            Some(hook) => Some(hook.execute(run).await),
            None => None,
        };

        log::info!("Run {} complete", run.run_id());

        Ok(RunReport {
            run: run.clone(),
            batch,
            loaded,
            aggregate,
            attempts,
            post_run_succeeded,
            finished_at: Utc::now(),
        })
    }
}
