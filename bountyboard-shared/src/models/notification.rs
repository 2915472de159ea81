/// Notification model
///
/// Simple templated message store. Notifications are fire-and-forget: the
/// ledger and the maintenance jobs create them after their own work has
/// committed, and a creation failure is logged and swallowed, never
/// propagated. The worker deletes rows older than 30 days daily.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     kind VARCHAR(50) NOT NULL,
///     title VARCHAR(255) NOT NULL,
///     message TEXT NOT NULL,
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Notification model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    /// Unique notification ID
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    /// Event kind (e.g. "bounty_awarded", "deadline_approaching")
    pub kind: String,

    /// Short title
    pub title: String,

    /// Templated message body
    pub message: String,

    /// Whether the recipient has read it
    pub is_read: bool,

    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    /// Recipient
    pub user_id: Uuid,

    /// Event kind
    pub kind: String,

    /// Short title
    pub title: String,

    /// Message body
    pub message: String,
}

impl Notification {
    /// Creates a notification
    pub async fn create(pool: &PgPool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, kind, title, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, kind, title, message, is_read, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.kind)
        .bind(data.title)
        .bind(data.message)
        .fetch_one(pool)
        .await?;

        Ok(notification)
    }

    /// Deletes notifications older than the given number of days
    ///
    /// Returns the number of rows deleted. Safe to re-run: the cutoff makes
    /// it naturally idempotent.
    pub async fn delete_older_than(pool: &PgPool, days: i64) -> Result<u64, sqlx::Error> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let result = sqlx::query("DELETE FROM notifications WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Fires a notification, logging and swallowing any failure
///
/// The financial write has already committed by the time this is called;
/// notification delivery must never fail the request.
pub async fn notify_best_effort(pool: &PgPool, data: CreateNotification) {
    if let Err(e) = Notification::create(pool, data).await {
        tracing::warn!("Failed to create notification: {}", e);
    }
}
