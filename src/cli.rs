//! CLI helper functions

use crate::{
    config::{PipelineConfig, StagingBackend},
    etl::{Pipeline, RunReport, Stage},
    model::{AggregateRow, BatchHandle, RunContext},
    schedule,
    stages::{RecordCountAggregator, SampleExtractor, SampleLoader},
    staging::StagingStore,
    warehouse::Warehouse,
};
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The sample pipeline: synthetic extract, raw load, record count
pub type SamplePipeline = Pipeline<SampleExtractor, SampleLoader, RecordCountAggregator>;

/// Report of one sample pipeline run
pub type SampleRunReport = RunReport<BatchHandle, usize, AggregateRow>;

/// Wire the three stages to the given stores
pub fn build_pipeline(
    config: &PipelineConfig,
    staging: Arc<dyn StagingStore>,
    warehouse: Arc<dyn Warehouse>,
) -> SamplePipeline {
    let extractor = SampleExtractor::new(
        staging.clone(),
        &config.staging.raw_bucket,
        config.extract.batch_size,
    );
    let loader = SampleLoader::new(
        staging,
        warehouse.clone(),
        &config.staging.raw_bucket,
        &config.staging.processed_bucket,
    )
    .with_mode(config.load.mode);
    let aggregator = RecordCountAggregator::new(warehouse, &config.aggregate.metric_name)
        .with_window(config.aggregate.window);

    Pipeline::new(extractor, loader, aggregator)
        .with_retry(config.retry.clone())
        .with_post_run(config.post_run.clone())
}

/// Run the pipeline once for `run`
///
/// Storage clients are opened for this run only and dropped when it ends.
pub async fn run_once(config: &PipelineConfig, run: &RunContext) -> Result<SampleRunReport> {
    let staging = config
        .staging
        .open()
        .context("Failed to open staging store")?;
    let warehouse = config
        .warehouse
        .open()
        .await
        .context("Failed to open warehouse")?;

    log::info!(
        "Staging: {}, warehouse: {}",
        staging.describe().bright_black(),
        warehouse.describe().bright_black()
    );

    let pipeline = build_pipeline(config, staging, warehouse);
    let report = pipeline.run(run).await?;
    log_report(&report);
    Ok(report)
}

/// Run once per day until interrupted
pub async fn run_scheduled(config: &PipelineConfig) -> Result<()> {
    log::info!("Starting daily schedule (no catch-up)");
    schedule::run_daily(move |run| async move {
        run_once(config, &run).await.map(|_| ())
    })
    .await
}

fn log_report(report: &SampleRunReport) {
    log::info!(
        "✓ Run {}: staged {}, loaded {} record(s), {}={}",
        report.run.run_id().cyan(),
        report.batch.bright_black(),
        report.loaded,
        report.aggregate.metric_name,
        report.aggregate.metric_value.green()
    );

    for stage in [Stage::Extract, Stage::Load, Stage::Aggregate] {
        let attempts = report.attempts_for(stage);
        if attempts > 1 {
            log::warn!("{} needed {} attempts", stage, attempts);
        }
    }

    if report.post_run_succeeded == Some(false) {
        log::warn!("Post-run hook failed; run results are unaffected");
    }
}

/// Create a project: default `pipeline.yml`, storage directories, warehouse
/// tables
///
/// An existing config file is left untouched. Returns the config path.
pub async fn init_project(project_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let project_dir = project_dir.as_ref();
    std::fs::create_dir_all(project_dir)
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let config_path = project_dir.join("pipeline.yml");
    if config_path.exists() {
        log::info!("Keeping existing {}", config_path.display().bright_black());
    } else {
        PipelineConfig::default().write(&config_path)?;
        log::info!("Wrote {}", config_path.display().bright_black());
    }

    let config = PipelineConfig::load(&config_path)?;

    if config.staging.backend == StagingBackend::Directory {
        for bucket in [&config.staging.raw_bucket, &config.staging.processed_bucket] {
            let dir = config.staging.root.join(bucket);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create bucket {}", dir.display()))?;
        }
    }

    let warehouse = config
        .warehouse
        .open()
        .await
        .context("Failed to open warehouse")?;
    warehouse
        .ensure_schema()
        .await
        .context("Failed to create warehouse tables")?;
    log::info!("✓ Warehouse ready ({})", warehouse.describe());

    Ok(config_path)
}

/// Print the newest mart rows and the raw row count
pub async fn report(config: &PipelineConfig, limit: usize) -> Result<Vec<AggregateRow>> {
    let warehouse = config
        .warehouse
        .open()
        .await
        .context("Failed to open warehouse")?;

    let raw = warehouse.raw_count().await?;
    let rows = warehouse.recent_aggregates(limit).await?;

    println!("{} {}", "raw.sample_data rows:".bold(), raw);
    if rows.is_empty() {
        println!("No aggregates yet");
    }
    for row in &rows {
        println!(
            "{}  {:<20} {}",
            row.aggregated_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .bright_black(),
            row.metric_name,
            row.metric_value.green()
        );
    }

    Ok(rows)
}
