//! Daily scheduling without catch-up
//!
//! A run fires at every 00:00 UTC boundary and processes the day that just
//! closed. Starting the scheduler never backfills days that passed before it
//! started: the first run is the next boundary.

use crate::model::RunContext;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use eyre::Result;
use std::future::Future;

/// Next 00:00 UTC strictly after `now`
pub fn next_fire_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

/// Logical date processed by the run that fires at `fire_time`
pub fn logical_date_for(fire_time: DateTime<Utc>) -> NaiveDate {
    let day = fire_time.date_naive();
    day.checked_sub_days(Days::new(1)).unwrap_or(day)
}

/// The next `count` firings after `now`, with the logical date of each
pub fn upcoming(now: DateTime<Utc>, count: usize) -> Vec<(DateTime<Utc>, NaiveDate)> {
    let mut fire = now;
    (0..count)
        .map(|_| {
            fire = next_fire_after(fire);
            (fire, logical_date_for(fire))
        })
        .collect()
}

/// Run `job` once per day until Ctrl-C
///
/// A failed run is logged and the loop continues with the next day; the
/// pipeline driver has already applied its retry policy by then.
pub async fn run_daily<F, Fut>(mut job: F) -> Result<()>
where
    F: FnMut(RunContext) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    loop {
        let now = Utc::now();
        let fire = next_fire_after(now);
        let wait = (fire - now).to_std().unwrap_or_default();
        log::info!(
            "Next run at {} for logical date {}",
            fire,
            logical_date_for(fire)
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Scheduler stopped");
                return Ok(());
            }
        }

        let run = RunContext::scheduled(logical_date_for(fire));
        if let Err(e) = job(run.clone()).await {
            log::error!("Run {} failed: {:#}", run.run_id(), e);
        }
    }
}
