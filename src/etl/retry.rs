//! Bounded retry of a single pipeline stage

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// The three stages of a run, named after their task ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Load,
    Aggregate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extract => write!(f, "extract_data"),
            Self::Load => write!(f, "transform_and_load"),
            Self::Aggregate => write!(f, "aggregate_data"),
        }
    }
}

/// How often and how patiently a failing stage is retried
///
/// A stage is attempted at most `retries + 1` times, waiting `delay` between
/// attempts. Every error is retried; there is no alerting.
///
/// ```yaml
/// retry:
///   retries: 1
///   delay: 5m
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,
}

fn default_retries() -> u32 {
    1
}

fn default_delay() -> Duration {
    Duration::from_secs(5 * 60)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            delay: default_delay(),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Run `op` until it succeeds or attempts are exhausted
    ///
    /// Returns the value together with the number of attempts it took. The
    /// final error is wrapped with the stage name and attempt count.
    pub async fn run<T, F, Fut>(&self, stage: Stage, mut op: F) -> Result<(T, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            log::debug!("Running {} (attempt {}/{})", stage, attempt, max_attempts);

            match op().await {
                Ok(value) => return Ok((value, attempt)),
                Err(e) if attempt < max_attempts => {
                    log::warn!(
                        "{} failed on attempt {}/{}: {:#}",
                        stage,
                        attempt,
                        max_attempts,
                        e
                    );
                    log::info!("Retrying {} in {:?}", stage, self.delay);
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).wrap_err_with(|| {
                        format!("{} failed after {} attempt(s)", stage, attempt)
                    });
                }
            }
        }
    }
}
