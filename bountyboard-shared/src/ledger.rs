/// The ledger: source of truth for user balances
///
/// Every balance mutation in the system goes through this module. All three
/// entry points share the same shape: open a database transaction, lock the
/// user row (`SELECT ... FOR UPDATE`), compute the new balance, write the
/// user row and an immutable [`Transaction`] audit record, commit. Only
/// after the commit is a best-effort notification fired; a notification
/// failure never rolls back or fails the financial mutation.
///
/// Invariants enforced here:
/// - balances are floored at zero: `after = max(0, before + delta)`;
/// - penalties are stored with a negative amount regardless of the positive
///   magnitude the caller passes;
/// - every ledger row satisfies `balance_after == clamp(balance_before +
///   amount)` and equals the user's balance at the instant of creation;
/// - concurrent mutations against the same user serialize on the row lock,
///   mutations against different users proceed in parallel.
///
/// Task completion ([`complete_task`]) lives here too: the status
/// transition and the resulting ledger write must be atomic from the
/// caller's point of view, so they share one database transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::notification::{notify_best_effort, CreateNotification};
use crate::models::task::Task;
use crate::models::transaction::{
    BountyStatistics, RecordTransaction, Transaction, TransactionKind,
};

/// Error type for ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No active user row for the given ID
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// Database error (the enclosing transaction has been rolled back)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error type for task completion
#[derive(Debug, thiserror::Error)]
pub enum CompleteTaskError {
    /// No task with the given ID
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    /// Task is not in a state that can be completed
    #[error("Task cannot be completed from status '{status}'")]
    InvalidState { status: String },

    /// Task has no assignee to pay
    #[error("Task {0} has no assignee")]
    NoAssignee(Uuid),

    /// Ledger failure (the status transition was rolled back with it)
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of completing a task
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// The completed task row
    pub task: Task,

    /// Whether the completion beat the deadline
    pub on_time: bool,

    /// The ledger entry the completion produced (bounty or penalty)
    pub entry: Transaction,
}

/// Clamps a balance mutation at zero
///
/// The floor applies to the *result*, not the delta: the stored ledger
/// amount keeps its full signed value even when the balance bottoms out.
pub fn clamped_balance(before: Decimal, delta: Decimal) -> Decimal {
    let after = before + delta;
    if after < Decimal::ZERO {
        Decimal::ZERO
    } else {
        after
    }
}

/// Formats a monetary value to exactly two decimal places
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Locks the user row and applies a signed delta, recording the audit entry
///
/// Runs inside the caller's transaction. The `FOR UPDATE` lock serializes
/// concurrent mutations per user, which is what closes the classic
/// read-modify-write lost-update race.
async fn apply_delta(
    conn: &mut PgConnection,
    user_id: Uuid,
    task_id: Option<Uuid>,
    kind: TransactionKind,
    delta: Decimal,
    reason: Option<String>,
) -> Result<Transaction, LedgerError> {
    let (balance_before,): (Decimal,) = sqlx::query_as(
        "SELECT balance FROM users WHERE id = $1 AND is_active = TRUE FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(LedgerError::UserNotFound(user_id))?;

    let balance_after = clamped_balance(balance_before, delta);

    sqlx::query("UPDATE users SET balance = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(balance_after)
        .execute(&mut *conn)
        .await?;

    let entry = Transaction::record(
        conn,
        RecordTransaction {
            user_id,
            task_id,
            kind,
            amount: delta,
            balance_before,
            balance_after,
            reason,
        },
    )
    .await?;

    Ok(entry)
}

/// Credits a bounty to a user
///
/// `amount` is a positive magnitude. Fails with
/// [`LedgerError::UserNotFound`] before any write if there is no active
/// user row.
pub async fn process_bounty(
    pool: &PgPool,
    user_id: Uuid,
    task_id: Uuid,
    amount: Decimal,
) -> Result<Transaction, LedgerError> {
    let mut tx = pool.begin().await?;
    let entry = apply_delta(
        &mut tx,
        user_id,
        Some(task_id),
        TransactionKind::Bounty,
        amount,
        None,
    )
    .await?;
    tx.commit().await?;

    notify_best_effort(
        pool,
        CreateNotification {
            user_id,
            kind: "bounty_awarded".to_string(),
            title: "Bounty awarded".to_string(),
            message: format!(
                "You earned {} for completing a task. New balance: {}",
                format_amount(entry.amount),
                format_amount(entry.balance_after)
            ),
        },
    )
    .await;

    Ok(entry)
}

/// Deducts a penalty from a user, floored at zero
///
/// `amount` is a positive magnitude; the stored ledger amount is its
/// negation (signed ledger convention).
pub async fn apply_penalty(
    pool: &PgPool,
    user_id: Uuid,
    task_id: Uuid,
    amount: Decimal,
    reason: String,
) -> Result<Transaction, LedgerError> {
    let mut tx = pool.begin().await?;
    let entry = apply_delta(
        &mut tx,
        user_id,
        Some(task_id),
        TransactionKind::Penalty,
        -amount.abs(),
        Some(reason),
    )
    .await?;
    tx.commit().await?;

    notify_best_effort(
        pool,
        CreateNotification {
            user_id,
            kind: "penalty_applied".to_string(),
            title: "Penalty applied".to_string(),
            message: format!(
                "A penalty of {} was deducted. New balance: {}",
                format_amount(entry.amount.abs()),
                format_amount(entry.balance_after)
            ),
        },
    )
    .await;

    Ok(entry)
}

/// Applies an admin-driven signed adjustment, floored at zero
///
/// The admin role check is enforced a layer up, in the route handler; this
/// function records who made the change in the reason text.
pub async fn adjust_balance(
    pool: &PgPool,
    user_id: Uuid,
    amount: Decimal,
    reason: String,
    admin_id: Uuid,
) -> Result<Transaction, LedgerError> {
    let mut tx = pool.begin().await?;
    let entry = apply_delta(
        &mut tx,
        user_id,
        None,
        TransactionKind::Adjustment,
        amount,
        Some(format!("{} (by admin {})", reason, admin_id)),
    )
    .await?;
    tx.commit().await?;

    notify_best_effort(
        pool,
        CreateNotification {
            user_id,
            kind: "balance_adjusted".to_string(),
            title: "Balance adjusted".to_string(),
            message: format!(
                "An administrator adjusted your balance by {}. New balance: {}",
                format_amount(entry.amount),
                format_amount(entry.balance_after)
            ),
        },
    )
    .await;

    Ok(entry)
}

/// Completes a reviewed task and settles the bounty or penalty
///
/// The status transition and the ledger write share one transaction: if the
/// ledger fails, the task does not silently advance to completed. The
/// `review` guard in [`Task::complete`] makes the whole thing idempotent;
/// a task already completed reports [`CompleteTaskError::InvalidState`]
/// and never re-triggers the payout.
///
/// On-time completion pays the full bounty. Late completion applies a
/// penalty of `bounty_amount * penalty_multiplier`, rounded to 2 dp.
pub async fn complete_task(
    pool: &PgPool,
    task_id: Uuid,
    penalty_multiplier: Decimal,
    now: DateTime<Utc>,
) -> Result<CompletionOutcome, CompleteTaskError> {
    let mut tx = pool.begin().await?;

    let task = Task::find_by_id_for_update(&mut tx, task_id)
        .await?
        .ok_or(CompleteTaskError::TaskNotFound(task_id))?;

    let assignee = task
        .assigned_to
        .ok_or(CompleteTaskError::NoAssignee(task_id))?;

    let completed = Task::complete(&mut tx, task_id, now)
        .await?
        .ok_or(CompleteTaskError::InvalidState {
            status: task.status.clone(),
        })?;

    let on_time = !completed.is_late_at(now);

    let entry = if on_time {
        apply_delta(
            &mut tx,
            assignee,
            Some(task_id),
            TransactionKind::Bounty,
            completed.bounty_amount,
            None,
        )
        .await?
    } else {
        let magnitude = (completed.bounty_amount * penalty_multiplier).round_dp(2);
        apply_delta(
            &mut tx,
            assignee,
            Some(task_id),
            TransactionKind::Penalty,
            -magnitude,
            Some(format!("Late completion of '{}'", completed.title)),
        )
        .await?
    };

    tx.commit().await?;

    let (kind, title, message) = if on_time {
        (
            "bounty_awarded",
            "Bounty awarded",
            format!(
                "You earned {} for completing '{}'. New balance: {}",
                format_amount(entry.amount),
                completed.title,
                format_amount(entry.balance_after)
            ),
        )
    } else {
        (
            "penalty_applied",
            "Late completion penalty",
            format!(
                "'{}' was completed after its deadline; {} was deducted. New balance: {}",
                completed.title,
                format_amount(entry.amount.abs()),
                format_amount(entry.balance_after)
            ),
        )
    };

    notify_best_effort(
        pool,
        CreateNotification {
            user_id: assignee,
            kind: kind.to_string(),
            title: title.to_string(),
            message,
        },
    )
    .await;

    Ok(CompletionOutcome {
        task: completed,
        on_time,
        entry,
    })
}

/// Aggregates ledger statistics
///
/// Penalty totals are reported as absolute values; the average is zero (not
/// a division error) when no bounties exist. All monetary outputs are 2 dp
/// strings.
pub async fn bounty_statistics(pool: &PgPool) -> Result<BountyStatistics, sqlx::Error> {
    let (total_bounties, total_penalties, bounty_count, penalty_count): (
        Decimal,
        Decimal,
        i64,
        i64,
    ) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(amount) FILTER (WHERE kind = 'bounty'), 0),
            COALESCE(SUM(amount) FILTER (WHERE kind = 'penalty'), 0),
            COUNT(*) FILTER (WHERE kind = 'bounty'),
            COUNT(*) FILTER (WHERE kind = 'penalty')
        FROM transactions
        "#,
    )
    .fetch_one(pool)
    .await?;

    let average = if bounty_count > 0 {
        (total_bounties / Decimal::from(bounty_count)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    Ok(BountyStatistics {
        total_bounties: format_amount(total_bounties),
        total_penalties: format_amount(total_penalties.abs()),
        bounty_count,
        penalty_count,
        average_bounty: format_amount(average),
    })
}
