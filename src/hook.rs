//! Post-run shell hook
//!
//! Runs an optional command (for example `dbt run`) after a successful run.
//! The hook never fails the run: a non-zero exit or a spawn error is logged
//! and reported as `false`.

use crate::model::RunContext;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRunHook {
    /// Shell command, run with `sh -c`
    pub command: String,

    /// Working directory, defaults to the current directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl PostRunHook {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Execute the hook for `run`
    ///
    /// The command sees `ETL_LOGICAL_DATE` and `ETL_RUN_ID` in its environment.
    pub async fn execute(&self, run: &RunContext) -> bool {
        log::info!("Running post-run hook: {}", self.command);

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .env(
                "ETL_LOGICAL_DATE",
                run.logical_date.format("%Y-%m-%d").to_string(),
            )
            .env("ETL_RUN_ID", run.run_id());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        match command.output().await {
            Ok(output) if output.status.success() => {
                log::debug!(
                    "Post-run hook output: {}",
                    String::from_utf8_lossy(&output.stdout).trim()
                );
                true
            }
            Ok(output) => {
                log::warn!(
                    "Post-run hook exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(e) => {
                log::warn!("Post-run hook could not be started: {}", e);
                false
            }
        }
    }
}
