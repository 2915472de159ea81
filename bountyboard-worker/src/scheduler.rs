/// Job scheduler
///
/// Drives the maintenance jobs on fixed intervals with `tokio::time`.
/// A failing run is logged and the cadence keeps going; the worker never
/// exits because one sweep hit a transient database error.

use crate::config::WorkerConfig;
use crate::jobs;
use chrono::Utc;
use sqlx::PgPool;
use tokio::time::{interval, MissedTickBehavior};
use tracing::error;

/// Runs all job loops until the shutdown future resolves
pub async fn run(pool: PgPool, config: WorkerConfig, shutdown: impl std::future::Future<Output = ()>) {
    let mut deadline_ticker = interval(config.deadline_scan_interval);
    deadline_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut daily_ticker = interval(config.daily_job_interval);
    daily_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = deadline_ticker.tick() => {
                if let Err(e) = jobs::deadline_scan::run(&pool, Utc::now()).await {
                    error!("Deadline scan failed: {}", e);
                }
            }
            _ = daily_ticker.tick() => {
                if let Err(e) = jobs::license_expiry::run(&pool, Utc::now()).await {
                    error!("License expiry sweep failed: {}", e);
                }
                if let Err(e) = jobs::notification_cleanup::run(&pool).await {
                    error!("Notification cleanup failed: {}", e);
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }
}
