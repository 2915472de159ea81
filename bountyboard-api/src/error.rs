/// Error handling for the API server
///
/// Unified error type that maps to HTTP responses. Handlers return
/// `Result<T, ApiError>`, which converts into a JSON error envelope of the
/// form `{ "error": "...", "message": "...", "details": [...] }`.
///
/// Domain errors from the shared crate (teams, ledger, licensing) convert
/// via `From` impls, so handlers can use `?` throughout.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use bountyboard_shared::auth::authorization::AuthzError;
use bountyboard_shared::auth::jwt::JwtError;
use bountyboard_shared::auth::password::PasswordError;
use bountyboard_shared::ledger::{CompleteTaskError, LedgerError};
use bountyboard_shared::license::LicenseError;
use bountyboard_shared::teams::TeamError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate username or team name
    Conflict(String),

    /// Bad request (400), field-level validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g. "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already exists".to_string());
                    }
                    if constraint.contains("username") {
                        return ApiError::Conflict("Username already exists".to_string());
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InsufficientRole { .. } => {
                ApiError::Forbidden("Insufficient permissions".to_string())
            }
            AuthzError::UnknownRole(role) => {
                ApiError::InternalError(format!("Unknown role: {}", role))
            }
            AuthzError::NotAuthorized => {
                ApiError::Forbidden("Not authorized to access this resource".to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::InvalidKey => ApiError::BadRequest(err.to_string()),
            LicenseError::KeyAlreadyAssigned => ApiError::Conflict(err.to_string()),
            LicenseError::Database(e) => e.into(),
        }
    }
}

impl From<TeamError> for ApiError {
    fn from(err: TeamError) -> Self {
        match err {
            TeamError::License(e) => e.into(),
            TeamError::NameTaken | TeamError::DuplicateIdentity => {
                ApiError::Conflict(err.to_string())
            }
            TeamError::AlreadyOnTeam | TeamError::InvalidRole(_) => {
                ApiError::BadRequest(err.to_string())
            }
            TeamError::TeamNotFound(_) | TeamError::UserNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            TeamError::NotAMember => ApiError::BadRequest(err.to_string()),
            TeamError::CapacityReached => ApiError::Forbidden(err.to_string()),
            TeamError::NoLicense(_) => {
                ApiError::Forbidden("No valid license found for your team".to_string())
            }
            TeamError::Database(e) => e.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
            LedgerError::Database(e) => e.into(),
        }
    }
}

impl From<CompleteTaskError> for ApiError {
    fn from(err: CompleteTaskError) -> Self {
        match err {
            CompleteTaskError::TaskNotFound(_) => ApiError::NotFound(err.to_string()),
            CompleteTaskError::InvalidState { .. } | CompleteTaskError::NoAssignee(_) => {
                ApiError::BadRequest(err.to_string())
            }
            CompleteTaskError::Ledger(e) => e.into(),
            CompleteTaskError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_team_error_mapping() {
        let err: ApiError = TeamError::NameTaken.into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = TeamError::CapacityReached.into();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err: ApiError = TeamError::License(LicenseError::InvalidKey).into();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err: ApiError = TeamError::License(LicenseError::KeyAlreadyAssigned).into();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_complete_task_error_mapping() {
        // A re-completed or mid-flight task reports 400, never 500.
        let err: ApiError = CompleteTaskError::InvalidState {
            status: "completed".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");

        // Field-level validation failures are client errors, not 422s.
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
