/// Ledger transaction model
///
/// Transactions are the append-only audit trail behind every balance
/// mutation. Rows are created exclusively by the ledger (see
/// [`crate::ledger`]) inside the same database transaction as the balance
/// write, and are never updated or deleted.
///
/// Signed ledger convention: `amount` is the signed delta actually applied
/// to the request. Bounties are positive, penalties are stored negative
/// regardless of what magnitude the caller passed, and admin adjustments
/// keep their caller-supplied sign. `balance_after` is the clamped result:
/// `balance_after = max(0, balance_before + amount)`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE transactions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id),
///     task_id UUID REFERENCES tasks(id) ON DELETE SET NULL,
///     kind VARCHAR(20) NOT NULL,
///     amount NUMERIC(12, 2) NOT NULL,
///     balance_before NUMERIC(12, 2) NOT NULL,
///     balance_after NUMERIC(12, 2) NOT NULL,
///     reason TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT transactions_kind_check CHECK (
///         kind IN ('bounty', 'penalty', 'adjustment')
///     )
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Reward for on-time task completion (positive amount)
    Bounty,

    /// Deduction for late completion (amount always stored negative)
    Penalty,

    /// Admin-driven correction (either sign)
    Adjustment,
}

impl TransactionKind {
    /// Converts kind to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Bounty => "bounty",
            TransactionKind::Penalty => "penalty",
            TransactionKind::Adjustment => "adjustment",
        }
    }

    /// Parses kind from its database representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bounty" => Some(TransactionKind::Bounty),
            "penalty" => Some(TransactionKind::Penalty),
            "adjustment" => Some(TransactionKind::Adjustment),
            _ => None,
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: Uuid,

    /// User whose balance was mutated
    pub user_id: Uuid,

    /// Task that triggered the entry (None for admin adjustments)
    pub task_id: Option<Uuid>,

    /// Entry kind ('bounty', 'penalty', 'adjustment')
    pub kind: String,

    /// Signed delta applied to the request
    pub amount: Decimal,

    /// Balance immediately before the mutation
    pub balance_before: Decimal,

    /// Balance immediately after: max(0, balance_before + amount)
    pub balance_after: Decimal,

    /// Human-readable reason (penalties and adjustments)
    pub reason: Option<String>,

    /// When the entry was recorded
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Gets the parsed kind enum
    pub fn get_kind(&self) -> Option<TransactionKind> {
        TransactionKind::from_str(&self.kind)
    }
}

/// Input for recording a ledger entry
///
/// Only the ledger constructs this; handlers never write transactions
/// directly.
#[derive(Debug, Clone)]
pub struct RecordTransaction {
    /// User whose balance was mutated
    pub user_id: Uuid,

    /// Triggering task, if any
    pub task_id: Option<Uuid>,

    /// Entry kind
    pub kind: TransactionKind,

    /// Signed delta
    pub amount: Decimal,

    /// Balance before the mutation
    pub balance_before: Decimal,

    /// Balance after the mutation
    pub balance_after: Decimal,

    /// Optional reason
    pub reason: Option<String>,
}

/// Aggregated ledger statistics
///
/// Monetary fields are 2 dp strings; the penalty total is reported as an
/// absolute value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BountyStatistics {
    /// Sum of all bounty amounts
    pub total_bounties: String,

    /// Sum of all penalty magnitudes (absolute value)
    pub total_penalties: String,

    /// Number of bounty entries
    pub bounty_count: i64,

    /// Number of penalty entries
    pub penalty_count: i64,

    /// total_bounties / bounty_count, "0.00" when there are no bounties
    pub average_bounty: String,
}

impl Transaction {
    /// Records a ledger entry inside an open transaction
    ///
    /// Always called with the user row already locked and updated in the
    /// same database transaction, so `balance_after` matches the user's
    /// balance at the instant of creation.
    pub async fn record(
        conn: &mut PgConnection,
        data: RecordTransaction,
    ) -> Result<Self, sqlx::Error> {
        let tx = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions
                (user_id, task_id, kind, amount, balance_before, balance_after, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, task_id, kind, amount, balance_before,
                      balance_after, reason, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.task_id)
        .bind(data.kind.as_str())
        .bind(data.amount)
        .bind(data.balance_before)
        .bind(data.balance_after)
        .bind(data.reason)
        .fetch_one(conn)
        .await?;

        Ok(tx)
    }

    /// Lists a user's ledger history, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let txs = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, task_id, kind, amount, balance_before,
                   balance_after, reason, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(txs)
    }

    /// Finds the most recent entry for a user
    pub async fn latest_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let tx = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, task_id, kind, amount, balance_before,
                   balance_after, reason, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            TransactionKind::Bounty,
            TransactionKind::Penalty,
            TransactionKind::Adjustment,
        ] {
            assert_eq!(TransactionKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::from_str("refund"), None);
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&TransactionKind::Penalty).unwrap();
        assert_eq!(json, "\"penalty\"");
    }
}
