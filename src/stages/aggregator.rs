//! Raw row count aggregator

use crate::etl::Aggregator;
use crate::model::{AggregateRow, RunContext};
use crate::warehouse::Warehouse;
use chrono::{DateTime, NaiveTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which day the aggregation window starts on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// 00:00 UTC of the day the aggregator executes
    #[default]
    WallClock,
    /// 00:00 UTC of the run's logical date
    LogicalDate,
}

/// Counts raw rows in the current window and appends the count to the mart
pub struct RecordCountAggregator {
    warehouse: Arc<dyn Warehouse>,
    metric_name: String,
    window: WindowMode,
}

impl RecordCountAggregator {
    pub fn new(warehouse: Arc<dyn Warehouse>, metric_name: impl Into<String>) -> Self {
        Self {
            warehouse,
            metric_name: metric_name.into(),
            window: WindowMode::default(),
        }
    }

    pub fn with_window(mut self, window: WindowMode) -> Self {
        self.window = window;
        self
    }

    /// Start of the window for `run` when executed at `now`
    pub fn window_start(&self, run: &RunContext, now: DateTime<Utc>) -> DateTime<Utc> {
        let day = match self.window {
            WindowMode::WallClock => now.date_naive(),
            WindowMode::LogicalDate => run.logical_date,
        };
        day.and_time(NaiveTime::MIN).and_utc()
    }
}

impl Aggregator for RecordCountAggregator {
    type Input = usize;
    type Output = AggregateRow;

    async fn aggregate(&self, run: &RunContext, loaded: &usize) -> Result<AggregateRow> {
        let now = Utc::now();
        if self.window == WindowMode::WallClock && run.logical_date != now.date_naive() {
            log::warn!(
                "Aggregating the window of {} for run {}; rows are counted by execution date, not logical date",
                now.date_naive(),
                run.run_id()
            );
        }

        let since = self.window_start(run, now);
        log::debug!("Counting raw rows created since {} ({} loaded this run)", since, loaded);

        let row = self
            .warehouse
            .append_count_since(&self.metric_name, since)
            .await?;

        log::info!(
            "Appended {}={} to mart.aggregated_data",
            row.metric_name,
            row.metric_value
        );

        Ok(row)
    }
}
