/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing user
/// accounts. A user belongs to at most one team at any time (`team_id` is
/// nullable; NULL means "no team yet") and carries a monetary balance that is
/// only ever mutated through the ledger.
///
/// Users are never hard-deleted. Deactivation flips `is_active` to false and
/// the row persists for audit and foreign-key integrity; a deactivated user
/// is excluded from `find_by_id` and therefore appears as "not found" to the
/// rest of the system.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(100) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role VARCHAR(20) NOT NULL DEFAULT 'member',
///     team_id UUID REFERENCES teams(id) ON DELETE SET NULL,
///     balance NUMERIC(12, 2) NOT NULL DEFAULT 0,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ,
///     CONSTRAINT users_balance_check CHECK (balance >= 0),
///     CONSTRAINT users_role_check CHECK (role IN ('member', 'manager', 'admin'))
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bountyboard_shared::models::user::{User, CreateUser, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Member,
///     team_id: None,
/// }).await?;
///
/// assert!(user.team_id.is_none());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// User role
///
/// Exactly three tiers. Authorization hinges on this: members claim and work
/// tasks, managers additionally manage team membership, admins additionally
/// adjust balances and delete teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Base tier: claim tasks, view statistics
    Member,

    /// Mid tier: member permissions plus team membership management
    Manager,

    /// Admin tier: full access, including balance adjustments
    Admin,
}

impl UserRole {
    /// Converts role to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }

    /// Parses role from its database representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "member" => Some(UserRole::Member),
            "manager" => Some(UserRole::Manager),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Checks if role can manage team membership (manager or admin)
    pub fn can_manage_members(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }

    /// Checks if role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Checks if this role meets or exceeds the required role
    pub fn has_permission(&self, required: &UserRole) -> bool {
        self.rank() >= required.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            UserRole::Admin => 3,
            UserRole::Manager => 2,
            UserRole::Member => 1,
        }
    }
}

/// User model representing an account
///
/// The password hash is never serialized into API responses.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Username (unique, case-sensitive)
    pub username: String,

    /// Email address (unique, case-sensitive)
    pub email: String,

    /// Argon2id password hash, never exposed in responses
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Role string ('member', 'manager', 'admin')
    pub role: String,

    /// Team the user belongs to (NULL = no team yet)
    pub team_id: Option<Uuid>,

    /// Current monetary balance, floored at zero by the ledger
    pub balance: Decimal,

    /// Soft-delete flag; inactive users are excluded from lookups by ID
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Gets the parsed role enum
    pub fn get_role(&self) -> Option<UserRole> {
        UserRole::from_str(&self.role)
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Username (must be unique)
    pub username: String,

    /// Email address (must be unique)
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    /// Role for the new account
    pub role: UserRole,

    /// Team to pre-bind the account to (used by team member creation)
    pub team_id: Option<Uuid>,
}

/// Input for updating an existing user's profile
///
/// All fields are optional. Only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New role (admin-driven role changes)
    pub role: Option<UserRole>,
}

impl User {
    /// Creates a new user in the database
    ///
    /// New accounts start with a zero balance and `is_active = true`.
    /// Registration passes `team_id: None`; the team member creation path
    /// pre-binds the account to a team.
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email already exists (unique
    /// constraint violation) or the database operation fails.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, role, team_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, role, team_id, balance,
                      is_active, created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role.as_str())
        .bind(data.team_id)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds an active user by ID
    ///
    /// Deactivated users are excluded: the row persists for audit purposes
    /// but the account behaves as "not found" everywhere a lookup by ID is
    /// used, including token verification.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, team_id, balance,
                   is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by username or email in a single query
    ///
    /// Used by login. Lookup is case-sensitive and exact-match. Inactive
    /// users ARE returned here so the caller can distinguish a disabled
    /// account from bad credentials.
    pub async fn find_by_identifier(
        pool: &PgPool,
        username_or_email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, team_id, balance,
                   is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE username = $1 OR email = $1
            "#,
        )
        .bind(username_or_email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Checks whether a username or email is already taken (case-sensitive)
    pub async fn identity_exists(
        pool: &PgPool,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Updates an existing user's profile
    ///
    /// Only non-None fields in `data` are written. `updated_at` is bumped.
    ///
    /// # Errors
    ///
    /// Returns an error if the new email collides with another account.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND is_active = TRUE \
             RETURNING id, username, email, password_hash, role, team_id, balance, \
             is_active, created_at, updated_at, last_login_at",
        );

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(role) = data.role {
            q = q.bind(role.as_str());
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Points a user at a team (or clears it with None)
    ///
    /// Takes a connection rather than a pool: membership changes always run
    /// inside a larger transaction with the checks that justify them.
    /// Returns true if the user was found and updated.
    pub async fn set_team(
        conn: &mut PgConnection,
        id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET team_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(team_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deactivates a user account (soft delete)
    ///
    /// The row is kept for audit and foreign-key integrity.
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp, called after successful auth
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the active members of a team, ordered by username
    pub async fn list_by_team(pool: &PgPool, team_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, team_id, balance,
                   is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE team_id = $1 AND is_active = TRUE
            ORDER BY username
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [UserRole::Member, UserRole::Manager, UserRole::Admin] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("owner"), None);
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(UserRole::Admin.has_permission(&UserRole::Manager));
        assert!(UserRole::Admin.has_permission(&UserRole::Member));
        assert!(UserRole::Manager.has_permission(&UserRole::Member));
        assert!(!UserRole::Member.has_permission(&UserRole::Manager));
        assert!(!UserRole::Manager.has_permission(&UserRole::Admin));
    }

    #[test]
    fn test_role_capabilities() {
        assert!(!UserRole::Member.can_manage_members());
        assert!(UserRole::Manager.can_manage_members());
        assert!(UserRole::Admin.can_manage_members());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Manager.is_admin());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: "member".to_string(),
            team_id: None,
            balance: Decimal::ZERO,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.email.is_none());
        assert!(update.password_hash.is_none());
        assert!(update.role.is_none());
    }

    // Integration tests for database operations are in bountyboard-api/tests/
}
