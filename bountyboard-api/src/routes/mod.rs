/// API route handlers
///
/// # Modules
///
/// - `health`: liveness check
/// - `auth`: registration, login, profile
/// - `teams`: team creation saga and membership management
/// - `tasks`: task lifecycle and assignment
/// - `bounties`: ledger queries and admin adjustments

use crate::error::{ApiError, ValidationErrorDetail};

pub mod auth;
pub mod bounties;
pub mod health;
pub mod tasks;
pub mod teams;

/// Maps validator errors onto the API's validation error shape
pub(crate) fn validation_error(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}
