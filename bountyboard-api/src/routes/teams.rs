/// Team management endpoints
///
/// # Endpoints
///
/// - `POST /v1/teams/create` - create a team (consumes a license key)
/// - `GET /v1/teams/:id` - team detail with member list (same team only)
/// - `POST /v1/teams/:id/members` - create a new user onto the team
/// - `DELETE /v1/teams/:id/members/:user_id` - detach a member
/// - `DELETE /v1/teams/:id` - soft-delete the team
///
/// Team creation returns a fresh token: the caller's old token still
/// carries the no-team snapshot, and clients swap it immediately.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use bountyboard_shared::{
    auth::{authorization, jwt, middleware::AuthContext, password},
    models::{
        team::Team,
        user::{User, UserRole},
    },
    teams,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create team request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    /// Team name (unique)
    #[validate(length(min = 1, max = 255, message = "Team name must be 1-255 characters"))]
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// License key to bind to the team
    #[validate(length(min = 1, message = "License key is required"))]
    pub license_key: String,
}

/// Create team response
#[derive(Debug, Serialize)]
pub struct CreateTeamResponse {
    /// The new team
    pub team: Team,

    /// Fresh token carrying the new team/license claims
    pub token: String,
}

/// Team detail response
#[derive(Debug, Serialize)]
pub struct TeamDetailResponse {
    pub team: Team,
    pub members: Vec<User>,
}

/// Add member request
#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(length(min = 3, max = 100, message = "Username must be 3-100 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// 'member' or 'manager'
    pub role: String,
}

/// Create a team bound to a license key
///
/// Runs the full saga in one transaction, then mints a replacement token
/// so the client's claims reflect the new team immediately.
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<CreateTeamResponse>)> {
    req.validate().map_err(super::validation_error)?;

    let (team, license) = teams::create_team(
        &state.db,
        &state.catalog,
        auth.user_id,
        teams::CreateTeamRequest {
            name: req.name,
            description: req.description,
            license_key: req.license_key,
        },
        Utc::now(),
    )
    .await?;

    let claims = jwt::Claims::new(auth.user_id, auth.username.clone(), auth.role.clone())
        .with_team(
            team.id,
            team.name.clone(),
            Some(license.license_key.clone()),
            license.expiration_date.map(|d| d.timestamp()),
        );
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok((StatusCode::CREATED, Json(CreateTeamResponse { team, token })))
}

/// Team detail with member list
///
/// Team isolation: callers see their own team only, outsiders get 403.
pub async fn get_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Json<TeamDetailResponse>> {
    authorization::require_team_membership(&auth, team_id)?;

    let team = Team::find_by_id(&state.db, team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let members = User::list_by_team(&state.db, team_id).await?;

    Ok(Json(TeamDetailResponse { team, members }))
}

/// Create a new user directly onto the team
///
/// Manager or admin only, and only for the caller's own team. Capacity is
/// enforced against the team's license inside the saga.
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    authorization::require_member_management(&auth)?;
    authorization::require_team_membership(&auth, team_id)?;

    req.validate().map_err(super::validation_error)?;

    let role = UserRole::from_str(&req.role)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid role: {}", req.role)))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = teams::add_member(
        &state.db,
        team_id,
        teams::AddMemberRequest {
            username: req.username,
            email: req.email,
            password_hash,
            role,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Detach a member from the team
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((team_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    authorization::require_member_management(&auth)?;
    authorization::require_team_membership(&auth, team_id)?;

    if user_id == auth.user_id {
        return Err(ApiError::BadRequest(
            "Cannot remove yourself from the team".to_string(),
        ));
    }

    teams::remove_member(&state.db, team_id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Soft-delete the team and detach every member
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authorization::require_admin(&auth)?;

    teams::delete_team(&state.db, team_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_team_request_validation() {
        let req = CreateTeamRequest {
            name: "".to_string(),
            description: None,
            license_key: "".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("license_key"));
    }

    #[test]
    fn test_add_member_role_parsing() {
        assert_eq!(UserRole::from_str("member"), Some(UserRole::Member));
        assert_eq!(UserRole::from_str("manager"), Some(UserRole::Manager));
        assert_eq!(UserRole::from_str("owner"), None);
    }
}
