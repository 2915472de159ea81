/// Deadline scan job
///
/// Runs hourly. Looks at assigned, unfinished tasks and warns assignees
/// whose deadline falls within the next 24 hours, or has already passed.
/// Notifications are fire-and-forget; a failed insert never fails the scan.

use bountyboard_shared::models::{
    notification::{notify_best_effort, CreateNotification},
    task::Task,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::info;

/// How far ahead of the deadline assignees are warned
const WARNING_WINDOW_HOURS: i64 = 24;

/// Outcome of one deadline scan
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeadlineScanReport {
    /// Tasks whose deadline is within the warning window but not yet passed
    pub approaching: usize,

    /// Tasks whose deadline has already passed
    pub overdue: usize,
}

/// Scans for tasks near or past their deadline and notifies assignees
pub async fn run(pool: &PgPool, now: DateTime<Utc>) -> Result<DeadlineScanReport, sqlx::Error> {
    let cutoff = now + Duration::hours(WARNING_WINDOW_HOURS);
    let tasks = Task::list_due_before(pool, cutoff).await?;

    let mut report = DeadlineScanReport::default();

    for task in tasks {
        // list_due_before only returns assigned rows
        let Some(assignee) = task.assigned_to else {
            continue;
        };

        if task.deadline <= now {
            report.overdue += 1;
            notify_best_effort(
                pool,
                CreateNotification {
                    user_id: assignee,
                    kind: "deadline_overdue".to_string(),
                    title: "Task overdue".to_string(),
                    message: format!(
                        "Task '{}' was due {}. Completing it now incurs a late penalty.",
                        task.title,
                        task.deadline.format("%Y-%m-%d %H:%M UTC")
                    ),
                },
            )
            .await;
        } else {
            report.approaching += 1;
            notify_best_effort(
                pool,
                CreateNotification {
                    user_id: assignee,
                    kind: "deadline_approaching".to_string(),
                    title: "Task deadline approaching".to_string(),
                    message: format!(
                        "Task '{}' is due {}.",
                        task.title,
                        task.deadline.format("%Y-%m-%d %H:%M UTC")
                    ),
                },
            )
            .await;
        }
    }

    info!(
        approaching = report.approaching,
        overdue = report.overdue,
        "Deadline scan complete"
    );

    Ok(report)
}
