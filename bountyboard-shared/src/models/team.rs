/// Team model and database operations
///
/// Teams group users for bounty work. A team is always created together with
/// exactly one license (see [`crate::teams::create_team`] for the
/// transactional saga); the license and team share lifecycle.
///
/// Deleting a team is a soft delete that also clears `team_id` on every
/// member in the same transaction, so members are never left pointing at a
/// dead team.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL UNIQUE,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Team model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    /// Unique team ID (UUID v4)
    pub id: Uuid,

    /// Team name (globally unique, case-sensitive)
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// User who created the team
    pub created_by: Uuid,

    /// Soft-delete flag
    pub is_active: bool,

    /// When the team was created
    pub created_at: DateTime<Utc>,

    /// When the team was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    /// Team name (must be unique)
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Creating user
    pub created_by: Uuid,
}

impl Team {
    /// Inserts a team row inside an open transaction
    ///
    /// Part of the team-creation saga; callers own the transaction and the
    /// uniqueness pre-check.
    pub async fn insert(conn: &mut PgConnection, data: CreateTeam) -> Result<Self, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, is_active, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.created_by)
        .fetch_one(conn)
        .await?;

        Ok(team)
    }

    /// Finds an active team by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, created_by, is_active, created_at, updated_at
            FROM teams
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(team)
    }

    /// Finds a team by name (case-sensitive, exact match)
    ///
    /// Includes inactive teams: the name stays reserved after soft delete.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, created_by, is_active, created_at, updated_at
            FROM teams
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(team)
    }

    /// Checks name uniqueness inside an open transaction
    pub async fn name_exists(conn: &mut PgConnection, name: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM teams WHERE name = $1)")
                .bind(name)
                .fetch_one(conn)
                .await?;

        Ok(exists)
    }

    /// Soft-deactivates a team inside an open transaction
    ///
    /// Returns true if the team existed and was active. The caller clears
    /// member `team_id`s in the same transaction.
    pub async fn deactivate(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE teams
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
