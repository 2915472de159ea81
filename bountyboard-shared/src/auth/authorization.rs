/// Authorization helpers and permission checks
///
/// Role-based access control over the three-tier role hierarchy
/// (member < manager < admin). Roles live on the user row and are loaded
/// into the [`AuthContext`] by the auth middleware on every request, so all
/// checks here are pure over the context and need no database access.
///
/// # Example
///
/// ```no_run
/// use bountyboard_shared::auth::authorization::{require_role, require_team_membership};
/// use bountyboard_shared::auth::middleware::AuthContext;
/// use bountyboard_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// fn check(auth: &AuthContext, team_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
///     require_role(auth, UserRole::Manager)?;
///     require_team_membership(auth, team_id)?;
///     Ok(())
/// }
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User's role is below the required tier
    #[error("Insufficient permissions: requires {required:?} role")]
    InsufficientRole { required: UserRole },

    /// User's role string in the database is unrecognized
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// User doesn't own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Checks that the authenticated user holds at least the required role
pub fn require_role(auth: &AuthContext, required: UserRole) -> Result<(), AuthzError> {
    let role = UserRole::from_str(&auth.role)
        .ok_or_else(|| AuthzError::UnknownRole(auth.role.clone()))?;

    if !role.has_permission(&required) {
        return Err(AuthzError::InsufficientRole { required });
    }

    Ok(())
}

/// Checks that the user is an admin
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, UserRole::Admin)
}

/// Checks that the user can manage team membership (manager or admin)
pub fn require_member_management(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, UserRole::Manager)
}

/// Checks that the user belongs to the given team specifically
pub fn require_team_membership(auth: &AuthContext, team_id: Uuid) -> Result<(), AuthzError> {
    if auth.team_id != Some(team_id) {
        return Err(AuthzError::NotAuthorized);
    }

    Ok(())
}
