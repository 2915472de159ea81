/// License model and database operations
///
/// A License row records a catalog key that has been consumed by a team.
/// One license per team (unique constraint on `team_id`), one team per key
/// (unique constraint on `license_key`).
///
/// A license is valid iff `is_active` AND (`expiration_date` is NULL OR
/// `expiration_date > now`). Expiration is reconciled lazily: any validity
/// check that finds an expired-but-still-active license persists
/// `is_active = FALSE` as a side effect. [`License::reconcile_expiry`] is
/// the pure state-transition half of that pattern; the caller persists.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE licenses (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     team_id UUID NOT NULL UNIQUE REFERENCES teams(id) ON DELETE CASCADE,
///     license_key VARCHAR(255) NOT NULL UNIQUE,
///     max_users INTEGER NOT NULL,
///     expiration_date TIMESTAMPTZ,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Outcome of reconciling a license's expiration state against a clock
///
/// Pure data: the caller decides whether to persist the deactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReconciliation {
    /// License is active and unexpired
    Valid,

    /// License was already deactivated (revoked or previously reconciled)
    Revoked,

    /// License is past its expiration date but the row still says active;
    /// the caller must persist `is_active = FALSE`
    NewlyExpired,
}

/// License model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct License {
    /// Unique license ID (UUID v4)
    pub id: Uuid,

    /// Team this license is bound to (one license per team)
    pub team_id: Uuid,

    /// The consumed catalog key (globally unique)
    pub license_key: String,

    /// Member capacity for the team
    pub max_users: i32,

    /// When the license expires (None = never)
    pub expiration_date: Option<DateTime<Utc>>,

    /// Active flag; false after revocation or lazy expiration
    pub is_active: bool,

    /// When the license row was created
    pub created_at: DateTime<Utc>,

    /// When the license row was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a license row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLicense {
    /// Team to bind the license to
    pub team_id: Uuid,

    /// Catalog key being consumed
    pub license_key: String,

    /// Member capacity from the catalog entry
    pub max_users: i32,

    /// Expiration from the catalog entry (None = never)
    pub expiration_date: Option<DateTime<Utc>>,
}

impl License {
    /// Computes the reconciled expiration state against `now`
    ///
    /// This is deliberately pure so the "a read causes a write" behavior of
    /// the license gate stays unit-testable without a clock or database:
    /// callers persist [`ExpiryReconciliation::NewlyExpired`] via
    /// [`License::deactivate`].
    pub fn reconcile_expiry(&self, now: DateTime<Utc>) -> ExpiryReconciliation {
        if !self.is_active {
            return ExpiryReconciliation::Revoked;
        }

        match self.expiration_date {
            Some(expiry) if expiry < now => ExpiryReconciliation::NewlyExpired,
            _ => ExpiryReconciliation::Valid,
        }
    }

    /// Checks validity against `now` without side effects
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.reconcile_expiry(now) == ExpiryReconciliation::Valid
    }

    /// Inserts a license row inside an open transaction
    ///
    /// Part of the team-creation saga.
    pub async fn insert(conn: &mut PgConnection, data: CreateLicense) -> Result<Self, sqlx::Error> {
        let license = sqlx::query_as::<_, License>(
            r#"
            INSERT INTO licenses (team_id, license_key, max_users, expiration_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, team_id, license_key, max_users, expiration_date,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(data.team_id)
        .bind(data.license_key)
        .bind(data.max_users)
        .bind(data.expiration_date)
        .fetch_one(conn)
        .await?;

        Ok(license)
    }

    /// Finds the license for a team
    pub async fn find_by_team(pool: &PgPool, team_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let license = sqlx::query_as::<_, License>(
            r#"
            SELECT id, team_id, license_key, max_users, expiration_date,
                   is_active, created_at, updated_at
            FROM licenses
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .fetch_optional(pool)
        .await?;

        Ok(license)
    }

    /// Finds the license for a team inside an open transaction, row-locked
    ///
    /// Used by the capacity check so concurrent member adds serialize on the
    /// license row instead of racing past `max_users`.
    pub async fn find_by_team_for_update(
        conn: &mut PgConnection,
        team_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let license = sqlx::query_as::<_, License>(
            r#"
            SELECT id, team_id, license_key, max_users, expiration_date,
                   is_active, created_at, updated_at
            FROM licenses
            WHERE team_id = $1
            FOR UPDATE
            "#,
        )
        .bind(team_id)
        .fetch_optional(conn)
        .await?;

        Ok(license)
    }

    /// Checks whether a catalog key is already bound to some team
    ///
    /// One key = one team: this is enforced before insert (and backstopped
    /// by the unique constraint).
    pub async fn key_is_bound(conn: &mut PgConnection, key: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM licenses WHERE license_key = $1)")
                .bind(key)
                .fetch_one(conn)
                .await?;

        Ok(exists)
    }

    /// Persists a deactivation (revocation or reconciled expiry)
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE licenses
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists active licenses whose expiration date has passed
    ///
    /// Used by the daily expiry sweep; the per-request gate reconciles
    /// lazily, this catches teams that go idle.
    pub async fn list_newly_expired(
        pool: &PgPool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let licenses = sqlx::query_as::<_, License>(
            r#"
            SELECT id, team_id, license_key, max_users, expiration_date,
                   is_active, created_at, updated_at
            FROM licenses
            WHERE is_active = TRUE AND expiration_date IS NOT NULL AND expiration_date < $1
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(licenses)
    }

    /// Lists active licenses expiring within the given number of days
    pub async fn list_expiring_within(
        pool: &PgPool,
        now: DateTime<Utc>,
        days: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let cutoff = now + chrono::Duration::days(days);
        let licenses = sqlx::query_as::<_, License>(
            r#"
            SELECT id, team_id, license_key, max_users, expiration_date,
                   is_active, created_at, updated_at
            FROM licenses
            WHERE is_active = TRUE
              AND expiration_date IS NOT NULL
              AND expiration_date >= $1
              AND expiration_date < $2
            "#,
        )
        .bind(now)
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

        Ok(licenses)
    }
}
