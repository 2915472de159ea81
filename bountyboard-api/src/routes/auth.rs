/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - register a new user (no team yet)
/// - `POST /v1/auth/login` - login with username or email, get a token
/// - `GET /v1/auth/me` - the live principal
/// - `PUT /v1/auth/me` - update email and/or password
///
/// Login enforces license state for team members: a user whose team's
/// license is revoked or expired is told so at login time rather than
/// getting a token that fails on first use.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use bountyboard_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::{
        license::{ExpiryReconciliation, License},
        team::Team,
        user::{CreateUser, UpdateUser, User, UserRole},
    },
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username (unique)
    #[validate(length(min = 3, max = 100, message = "Username must be 3-100 characters"))]
    pub username: String,

    /// Email address (unique)
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub identifier: String,

    /// Password
    pub password: String,
}

/// Team summary carried in the login response
#[derive(Debug, Serialize)]
pub struct TeamSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_expiry: Option<i64>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The authenticated user (password hash never serialized)
    pub user: User,

    /// Bearer token, 8-hour lifetime
    pub token: String,

    /// Present and true when the user has no team yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_team: Option<bool>,

    /// Present when the user belongs to a team
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamSummary>,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Register a new user
///
/// The account starts with no team, a zero balance, and the 'member' role.
/// Duplicate username or email is rejected with 400 before the insert.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate().map_err(super::validation_error)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    if User::identity_exists(&state.db, &req.username, &req.email).await? {
        return Err(ApiError::BadRequest(
            "Username or email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            role: UserRole::Member,
            team_id: None,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Login with username or email
///
/// Unknown identifier and wrong password are indistinguishable (401). A
/// deactivated account gets 403. A member of a team whose license is
/// revoked or expired also gets 403, with the expiry persisted in passing.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = User::find_by_identifier(&state.db, &req.identifier)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is disabled".to_string()));
    }

    // Team users must have a valid license to log in at all.
    let team = match user.team_id {
        Some(team_id) => {
            check_license(&state, team_id).await?;
            Team::find_by_id(&state.db, team_id).await?
        }
        None => None,
    };

    User::update_last_login(&state.db, user.id).await?;

    let mut claims = jwt::Claims::new(user.id, user.username.clone(), user.role.clone());
    let mut team_summary = None;
    let mut no_team = Some(true);

    if let Some(ref team) = team {
        let license = License::find_by_team(&state.db, team.id).await?;
        let license_expiry = license
            .as_ref()
            .and_then(|l| l.expiration_date)
            .map(|d| d.timestamp());

        claims = claims.with_team(
            team.id,
            team.name.clone(),
            license.map(|l| l.license_key),
            license_expiry,
        );
        team_summary = Some(TeamSummary {
            id: team.id.to_string(),
            name: team.name.clone(),
            license_expiry,
        });
        no_team = None;
    }

    let token = jwt::create_token(&claims, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

    Ok(Json(LoginResponse {
        user,
        token,
        no_team,
        team: team_summary,
    }))
}

/// Returns the live principal for the presented token
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Updates the caller's email and/or password
///
/// A duplicate email surfaces as 409 via the unique constraint.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<User>> {
    req.validate().map_err(super::validation_error)?;

    if req.email.is_none() && req.password.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    let password_hash = match req.password {
        Some(ref p) => Some(password::hash_password(p)?),
        None => None,
    };

    let user = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            email: req.email,
            password_hash,
            role: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Applies the login-time license check for a team, with lazy expiry
async fn check_license(state: &AppState, team_id: uuid::Uuid) -> ApiResult<()> {
    let license = License::find_by_team(&state.db, team_id)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden("No valid license found for your team".to_string())
        })?;

    match license.reconcile_expiry(Utc::now()) {
        ExpiryReconciliation::Valid => Ok(()),
        ExpiryReconciliation::Revoked => Err(ApiError::Forbidden(
            "Your team's license has been revoked".to_string(),
        )),
        ExpiryReconciliation::NewlyExpired => {
            if let Err(e) = License::deactivate(&state.db, license.id).await {
                tracing::warn!(license_id = %license.id, "Failed to persist license expiry: {}", e);
            }
            Err(ApiError::Forbidden(
                "Your team's license has expired".to_string(),
            ))
        }
    }
}
