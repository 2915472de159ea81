/// Database models for BountyBoard
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts, roles, and balances
/// - `team`: Teams and their lifecycle
/// - `license`: Per-team license records with lazy expiration
/// - `task`: Bounty tasks and the claim/review/complete state machine
/// - `transaction`: Append-only ledger entries
/// - `notification`: Fire-and-forget templated messages
///
/// # Example
///
/// ```no_run
/// use bountyboard_shared::models::user::{User, CreateUser, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Member,
///     team_id: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod license;
pub mod notification;
pub mod task;
pub mod team;
pub mod transaction;
pub mod user;
