/// Task model and database operations
///
/// Tasks carry a monetary bounty and move through a one-directional state
/// machine, with a single escape hatch back to the open pool:
///
/// ```text
/// available --assign--> in_progress --> review --> completed
///                       in_progress --unassign--> available
/// ```
///
/// Completion is where the task orchestrator meets the ledger: the first
/// (and only) transition into `completed` pays the bounty when on time, or
/// applies a fractional penalty when late. That coupling lives in
/// [`crate::ledger::complete_task`]; this module owns the rows and the
/// transition guards.
///
/// Invariant: `assigned_to IS NOT NULL` implies `status != 'available'`.
/// Every transition below maintains it with conditional updates.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     bounty_amount NUMERIC(12, 2) NOT NULL,
///     deadline TIMESTAMPTZ NOT NULL,
///     status VARCHAR(20) NOT NULL DEFAULT 'available',
///     priority VARCHAR(10) NOT NULL DEFAULT 'medium',
///     created_by UUID NOT NULL REFERENCES users(id),
///     assigned_to UUID REFERENCES users(id),
///     assigned_at TIMESTAMPTZ,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tasks_bounty_check CHECK (bounty_amount > 0),
///     CONSTRAINT tasks_status_check CHECK (
///         status IN ('available', 'in_progress', 'review', 'completed')
///     ),
///     CONSTRAINT tasks_priority_check CHECK (
///         priority IN ('low', 'medium', 'high')
///     )
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Open for claiming, no assignee
    Available,

    /// Claimed and being worked
    InProgress,

    /// Submitted, awaiting sign-off
    Review,

    /// Done; the ledger has been triggered exactly once
    Completed,
}

impl TaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Available => "available",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
        }
    }

    /// Parses status from its database representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(TaskStatus::Available),
            "in_progress" => Some(TaskStatus::InProgress),
            "review" => Some(TaskStatus::Review),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    /// Checks if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Checks if a transition to the target status is allowed
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        match (self, target) {
            // Forward progression
            (TaskStatus::Available, TaskStatus::InProgress) => true,
            (TaskStatus::InProgress, TaskStatus::Review) => true,
            (TaskStatus::Review, TaskStatus::Completed) => true,

            // Explicit escape back to the open pool
            (TaskStatus::InProgress, TaskStatus::Available) => true,

            _ => false,
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Short title
    pub title: String,

    /// Optional long description
    pub description: Option<String>,

    /// Bounty paid on on-time completion (positive)
    pub bounty_amount: Decimal,

    /// Completion deadline; completing after it converts the bounty into a
    /// fractional penalty
    pub deadline: DateTime<Utc>,

    /// Lifecycle status ('available', 'in_progress', 'review', 'completed')
    pub status: String,

    /// Priority ('low', 'medium', 'high')
    pub priority: String,

    /// User who created the task
    pub created_by: Uuid,

    /// Current assignee (None while available)
    pub assigned_to: Option<Uuid>,

    /// When the task was claimed
    pub assigned_at: Option<DateTime<Utc>>,

    /// When the task was completed
    pub completed_at: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Gets the parsed status enum
    pub fn get_status(&self) -> Option<TaskStatus> {
        TaskStatus::from_str(&self.status)
    }

    /// Checks whether the completion moment missed the deadline
    pub fn is_late_at(&self, completed_at: DateTime<Utc>) -> bool {
        completed_at > self.deadline
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Short title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Bounty paid on completion (must be positive)
    pub bounty_amount: Decimal,

    /// Completion deadline
    pub deadline: DateTime<Utc>,

    /// Priority
    pub priority: TaskPriority,

    /// Creating user
    pub created_by: Uuid,
}

impl Task {
    /// Creates a new task in the available state
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, bounty_amount, deadline, priority, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, bounty_amount, deadline, status, priority,
                      created_by, assigned_to, assigned_at, completed_at, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.bounty_amount)
        .bind(data.deadline)
        .bind(data.priority.as_str())
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, bounty_amount, deadline, status, priority,
                   created_by, assigned_to, assigned_at, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks, optionally filtered by status, newest first
    pub async fn list(
        pool: &PgPool,
        status: Option<TaskStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = match status {
            Some(status) => {
                sqlx::query_as::<_, Task>(
                    r#"
                    SELECT id, title, description, bounty_amount, deadline, status, priority,
                           created_by, assigned_to, assigned_at, completed_at,
                           created_at, updated_at
                    FROM tasks
                    WHERE status = $1
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Task>(
                    r#"
                    SELECT id, title, description, bounty_amount, deadline, status, priority,
                           created_by, assigned_to, assigned_at, completed_at,
                           created_at, updated_at
                    FROM tasks
                    ORDER BY created_at DESC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(tasks)
    }

    /// Claims an available task for a user
    ///
    /// The conditional update is the whole race defense: only one concurrent
    /// claimer can match `status = 'available' AND assigned_to IS NULL`.
    /// Returns None when the task is already claimed or not available.
    pub async fn assign(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'in_progress',
                assigned_to = $2,
                assigned_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'available' AND assigned_to IS NULL
            RETURNING id, title, description, bounty_amount, deadline, status, priority,
                      created_by, assigned_to, assigned_at, completed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Returns an in-progress task to the open pool, clearing the assignee
    pub async fn unassign(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'available',
                assigned_to = NULL,
                assigned_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING id, title, description, bounty_amount, deadline, status, priority,
                      created_by, assigned_to, assigned_at, completed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Moves an in-progress task to review
    pub async fn submit_for_review(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'review', updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING id, title, description, bounty_amount, deadline, status, priority,
                      created_by, assigned_to, assigned_at, completed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Locks and re-reads a task inside an open transaction
    ///
    /// Used by completion so the status check, the status write, and the
    /// ledger write all see the same row state.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, bounty_amount, deadline, status, priority,
                   created_by, assigned_to, assigned_at, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(task)
    }

    /// Marks a reviewed task completed, inside an open transaction
    ///
    /// The `status = 'review'` guard makes completion idempotent against the
    /// ledger: a second attempt matches nothing and the caller never
    /// re-triggers the payout.
    pub async fn complete(
        conn: &mut PgConnection,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'completed', completed_at = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'review'
            RETURNING id, title, description, bounty_amount, deadline, status, priority,
                      created_by, assigned_to, assigned_at, completed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(completed_at)
        .fetch_optional(conn)
        .await?;

        Ok(task)
    }

    /// Lists assigned, unfinished tasks whose deadline falls before `cutoff`
    ///
    /// Used by the hourly deadline scan to warn assignees.
    pub async fn list_due_before(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, bounty_amount, deadline, status, priority,
                   created_by, assigned_to, assigned_at, completed_at, created_at, updated_at
            FROM tasks
            WHERE status IN ('in_progress', 'review')
              AND assigned_to IS NOT NULL
              AND deadline < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }
}
