/// Authentication and license-gate middleware for Axum
///
/// Two layers, applied in order:
///
/// 1. **JWT middleware**: validates the `Authorization: Bearer <token>`
///    header, then re-fetches the user from the database. The context
///    handlers see reflects the user's *current* role and team, not the
///    snapshot baked into the token; a user moved off a team or deactivated
///    since login is cut off on their next request.
/// 2. **License gate**: for routes that require a licensed team, re-derives
///    license validity from the database on every request. A license that
///    is found expired is deactivated in passing (lazy reconciliation), so
///    the expiry eventually becomes durable state even if the maintenance
///    worker never runs.
///
/// After success the layers add [`AuthContext`] (and [`LicenseContext`] for
/// gated routes) to request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Router, routing::get, middleware};
/// use bountyboard_shared::auth::middleware::{create_jwt_middleware, AuthContext};
/// use sqlx::PgPool;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.username)
/// }
///
/// fn router(pool: PgPool) -> Router {
///     Router::new()
///         .route("/me", get(handler))
///         .layer(middleware::from_fn(create_jwt_middleware(pool, "secret".to_string())))
/// }
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::license::{ExpiryReconciliation, License};
use crate::models::user::User;

/// Authentication context added to request extensions
///
/// Built from the database row, not the token claims: role and team
/// membership are always current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Username
    pub username: String,

    /// Current role ('member', 'manager', 'admin')
    pub role: String,

    /// Current team, if any
    pub team_id: Option<Uuid>,
}

impl AuthContext {
    /// Builds the context from a freshly loaded user row
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            team_id: user.team_id,
        }
    }
}

/// License context added to request extensions by the license gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseContext {
    /// The license row ID
    pub license_id: Uuid,

    /// The team the license belongs to
    pub team_id: Uuid,

    /// The bound license key
    pub license_key: String,

    /// Member capacity the license grants
    pub max_users: i32,

    /// Expiration, None for perpetual licenses
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Error type for authentication and license-gate middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Token is valid but the user row is gone or deactivated
    UserNotFound,

    /// License gate: user has no team
    NoTeam,

    /// License gate: team has no license row
    NoLicense,

    /// License gate: license was revoked
    LicenseRevoked,

    /// License gate: license expired
    LicenseExpired,

    /// Database error
    DatabaseError(String),
}

impl AuthError {
    fn status_and_message(&self) -> (StatusCode, &str, String) {
        match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
            }
            AuthError::InvalidToken(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AuthError::UserNotFound => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "User account not found or disabled".to_string(),
            ),
            AuthError::NoTeam => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "No team assigned".to_string(),
            ),
            AuthError::NoLicense => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "No valid license found for your team".to_string(),
            ),
            AuthError::LicenseRevoked => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Your team's license has been revoked".to_string(),
            ),
            AuthError::LicenseExpired => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Your team's license has expired".to_string(),
            ),
            AuthError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::DatabaseError(ref msg) = self {
            tracing::error!("Auth middleware database error: {}", msg);
        }

        let (status, error, message) = self.status_and_message();
        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// JWT authentication middleware
///
/// Validates the bearer token, then loads the live user row. Responds 401
/// if the header is missing, the token fails validation, or the user no
/// longer exists / is deactivated.
pub async fn jwt_auth_middleware(
    pool: PgPool,
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    // The token's team/license snapshot is advisory only; authorization
    // works off the live row.
    let user = User::find_by_id(&pool, claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

    req.extensions_mut().insert(AuthContext::from_user(&user));

    Ok(next.run(req).await)
}

/// License-gate middleware
///
/// Must run after [`jwt_auth_middleware`]. Rejects with 403 when the user
/// has no team, the team has no license row, or the license is revoked or
/// expired. An expired-but-still-active license row is deactivated here;
/// a failure to persist that flip still rejects the request.
pub async fn license_gate_middleware(
    pool: PgPool,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or(AuthError::MissingCredentials)?;

    let team_id = auth.team_id.ok_or(AuthError::NoTeam)?;

    let license = License::find_by_team(&pool, team_id)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::NoLicense)?;

    match license.reconcile_expiry(Utc::now()) {
        ExpiryReconciliation::Valid => {}
        ExpiryReconciliation::Revoked => return Err(AuthError::LicenseRevoked),
        ExpiryReconciliation::NewlyExpired => {
            if let Err(e) = License::deactivate(&pool, license.id).await {
                tracing::warn!(
                    license_id = %license.id,
                    "Failed to persist license expiry: {}",
                    e
                );
            } else {
                tracing::info!(
                    license_id = %license.id,
                    team_id = %team_id,
                    "License expired, deactivated on access"
                );
            }
            return Err(AuthError::LicenseExpired);
        }
    }

    req.extensions_mut().insert(LicenseContext {
        license_id: license.id,
        team_id,
        license_key: license.license_key,
        max_users: license.max_users,
        expiration_date: license.expiration_date,
    });

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
///
/// Captures the pool and secret for use with `middleware::from_fn`.
pub fn create_jwt_middleware(
    pool: PgPool,
    secret: String,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    move |req, next| {
        let pool = pool.clone();
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(pool, secret, req, next))
    }
}

/// Creates a license-gate middleware closure
pub fn create_license_gate(
    pool: PgPool,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    move |req, next| {
        let pool = pool.clone();
        Box::pin(license_gate_middleware(pool, req, next))
    }
}
