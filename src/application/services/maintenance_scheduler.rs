//! Maintenance Scheduler - Daily validate-and-refresh sweep
//!
//! A single background task, armed once per process, that wakes shortly
//! after local midnight and then every period after that, running
//! maintenance on every active plot registry.

use std::sync::{OnceLock, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use tokio::task::JoinHandle;
use tracing::info;

use crate::application::services::registry_directory::RegistryDirectory;

/// Default gap between local midnight and the first sweep
pub const DEFAULT_FIRST_RUN_OFFSET_MINUTES: i64 = 1;

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Default time between sweeps
pub const DEFAULT_PERIOD: Duration = ONE_DAY;

pub struct MaintenanceScheduler {
    first_run_offset: chrono::Duration,
    period: Duration,
    task: OnceLock<JoinHandle<()>>,
}

impl Default for MaintenanceScheduler {
    fn default() -> Self {
        Self::new(
            chrono::Duration::minutes(DEFAULT_FIRST_RUN_OFFSET_MINUTES),
            DEFAULT_PERIOD,
        )
    }
}

impl MaintenanceScheduler {
    /// `first_run_offset` is measured from the next local midnight and is
    /// clamped into that day
    pub fn new(first_run_offset: chrono::Duration, period: Duration) -> Self {
        let latest = chrono::Duration::days(1) - chrono::Duration::minutes(1);
        Self {
            first_run_offset: first_run_offset.clamp(chrono::Duration::zero(), latest),
            period: period.max(Duration::from_secs(1)),
            task: OnceLock::new(),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.get().is_some()
    }

    /// Start the background task unless it is already running
    ///
    /// Returns true only for the call that actually armed it. Must be called
    /// from within a tokio runtime.
    pub fn arm(&self, directory: Weak<RegistryDirectory>) -> bool {
        if self.task.get().is_some() {
            return false;
        }

        let mut armed_now = false;
        self.task.get_or_init(|| {
            armed_now = true;
            let delay = delay_until_next_run(&chrono::Local::now(), self.first_run_offset);
            info!(
                "Plot maintenance armed: first run in {} minutes, then every {} minutes",
                delay.as_secs() / 60,
                self.period.as_secs() / 60
            );
            tokio::spawn(run_maintenance_loop(directory, delay, self.period))
        });
        armed_now
    }
}

impl Drop for MaintenanceScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.get() {
            task.abort();
        }
    }
}

/// Time from `now` until `offset` past the next midnight in `now`'s time zone
///
/// A target that does not exist or is not in the future falls back to one
/// day, so the first run is never immediate.
pub fn delay_until_next_run<Tz: TimeZone>(
    now: &DateTime<Tz>,
    offset: chrono::Duration,
) -> Duration {
    let next_run = now
        .date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.checked_add_signed(offset))
        .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest())
        .filter(|next| next > now)
        .or_else(|| now.clone().checked_add_signed(chrono::Duration::days(1)));

    next_run
        .and_then(|next| (next - now.clone()).to_std().ok())
        .unwrap_or(ONE_DAY)
}

async fn run_maintenance_loop(
    directory: Weak<RegistryDirectory>,
    delay: Duration,
    period: Duration,
) {
    let start = tokio::time::Instant::now() + delay;
    let mut ticker = tokio::time::interval_at(start, period);

    loop {
        ticker.tick().await;
        let Some(directory) = directory.upgrade() else {
            info!("Plot directory is gone, stopping maintenance");
            break;
        };

        info!("Updating all plots");
        let report = directory.maintain_all().await;
        info!(
            "Updating all plots finished: {} worlds, {} plots removed, {} worlds failed",
            report.registries,
            report.evicted,
            report.failed.len()
        );
    }
}
