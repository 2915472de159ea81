/// Common test utilities for integration tests
///
/// All integration tests require a running PostgreSQL database. When
/// DATABASE_URL is not set, [`setup`] returns None and the test skips
/// itself. Every helper generates unique identities so tests can share
/// one database and run in parallel.

use bountyboard_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
use bountyboard_shared::license::{LicenseCatalog, LicenseKeyEntry};
use bountyboard_shared::models::{
    task::{CreateTask, Task, TaskPriority},
    user::{CreateUser, User, UserRole},
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Connects to the test database and runs migrations, or skips
pub async fn setup() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;

    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 5,
        ..Default::default()
    })
    .await
    .expect("Failed to create test pool");

    run_migrations(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

/// Creates an active user with a unique identity
pub async fn create_user(pool: &PgPool, role: UserRole) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    User::create(
        pool,
        CreateUser {
            username: format!("user-{}", &tag[..12]),
            email: format!("{}@test.example", &tag[..12]),
            password_hash: "$argon2id$fake-hash-for-tests".to_string(),
            role,
            team_id: None,
        },
    )
    .await
    .expect("Failed to create test user")
}

/// Builds a single-entry catalog with a unique key
///
/// Returns the catalog and the key it contains.
pub fn test_catalog(max_users: i32, expiry: Option<DateTime<Utc>>) -> (LicenseCatalog, String) {
    let key = format!("BNTY-TEST-{}", Uuid::new_v4().simple());
    let catalog = LicenseCatalog::from_entries(vec![LicenseKeyEntry {
        key: key.clone(),
        max_users,
        expiry_date: expiry,
        notes: None,
    }]);
    (catalog, key)
}

/// Creates an available task with the given bounty and deadline
pub async fn create_task(
    pool: &PgPool,
    created_by: Uuid,
    bounty: Decimal,
    deadline: DateTime<Utc>,
) -> Task {
    Task::create(
        pool,
        CreateTask {
            title: format!("Task {}", Uuid::new_v4().simple()),
            description: None,
            bounty_amount: bounty,
            deadline,
            priority: TaskPriority::Medium,
            created_by,
        },
    )
    .await
    .expect("Failed to create test task")
}

/// Creates a task, claims it for the user, and submits it for review
pub async fn create_task_in_review(
    pool: &PgPool,
    created_by: Uuid,
    assignee: Uuid,
    bounty: Decimal,
    deadline: DateTime<Utc>,
) -> Task {
    let task = create_task(pool, created_by, bounty, deadline).await;
    Task::assign(pool, task.id, assignee)
        .await
        .expect("Failed to assign task")
        .expect("Task should be assignable");
    Task::submit_for_review(pool, task.id)
        .await
        .expect("Failed to submit for review")
        .expect("Task should be submittable")
}

/// Reads a user's current balance
pub async fn balance_of(pool: &PgPool, user_id: Uuid) -> Decimal {
    let user = User::find_by_id(pool, user_id)
        .await
        .expect("Failed to fetch user")
        .expect("User should exist");
    user.balance
}

/// A deadline comfortably in the future
pub fn future_deadline() -> DateTime<Utc> {
    Utc::now() + Duration::days(7)
}
