//! Daily background scheduler.
//!
//! Runs [`SyncOrchestrator::check_and_update`] once at startup (optional)
//! and then every day at `hour_utc:00` UTC until the cancellation token
//! fires. Cancellation only interrupts the wait between runs: a pass that
//! has started finishes before the task exits. A failed run is logged and
//! the loop carries on.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use pulse_settings::ScheduleSettings;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::orchestrator::SyncOrchestrator;
use crate::report::SyncOutcome;

/// Next instant strictly after `now` whose UTC time is `hour:00:00`.
///
/// Hours above 23 are treated as 0.
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(time).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Background task handle factory.
pub struct Scheduler;

impl Scheduler {
    /// Spawn the scheduler loop. Returns `None` when scheduling is disabled.
    pub fn spawn(
        orchestrator: Arc<SyncOrchestrator>,
        schedule: ScheduleSettings,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if !schedule.enabled {
            info!("sync schedule disabled");
            return None;
        }
        Some(tokio::spawn(run(orchestrator, schedule, cancel)))
    }
}

async fn run(
    orchestrator: Arc<SyncOrchestrator>,
    schedule: ScheduleSettings,
    cancel: CancellationToken,
) {
    if schedule.run_on_startup && !cancel.is_cancelled() {
        tick(&orchestrator).await;
    }

    while !cancel.is_cancelled() {
        let now = Utc::now();
        let next = next_run_after(now, schedule.hour_utc);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next, "next scheduled sync check");

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }
        tick(&orchestrator).await;
    }
    info!("sync scheduler stopped");
}

async fn tick(orchestrator: &SyncOrchestrator) {
    match orchestrator.check_and_update().await {
        Ok(SyncOutcome::Fresh { age_seconds }) => {
            info!(age_seconds, "scheduled check: fresh");
        }
        Ok(SyncOutcome::Synced(report)) => {
            info!(
                run_id = %report.run_id,
                commits_stored = report.commits_stored,
                "scheduled check: synced"
            );
        }
        Err(e) => error!(error = %e, "scheduled sync failed"),
    }
}
