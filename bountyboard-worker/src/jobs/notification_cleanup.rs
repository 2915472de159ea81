/// Notification cleanup job
///
/// Runs daily and deletes notifications older than the retention window.

use bountyboard_shared::models::notification::Notification;
use sqlx::PgPool;
use tracing::info;

/// Retention window in days
const RETENTION_DAYS: i64 = 30;

/// Deletes notifications past the retention window, returning the count
pub async fn run(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let deleted = Notification::delete_older_than(pool, RETENTION_DAYS).await?;
    info!(deleted, "Notification cleanup complete");
    Ok(deleted)
}
