/// Bounty ledger endpoints
///
/// - `POST /v1/bounties/adjust` - admin balance adjustment with audit trail
/// - `GET /v1/bounties/statistics` - aggregate payout figures
/// - `GET /v1/bounties/transactions` - caller's ledger history

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use bountyboard_shared::{
    auth::{authorization, middleware::AuthContext},
    ledger,
    models::transaction::{BountyStatistics, Transaction},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Admin balance adjustment request
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustBalanceRequest {
    /// User whose balance to mutate
    pub user_id: Uuid,

    /// Signed delta; negative values clamp at a zero balance
    pub amount: Decimal,

    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: String,
}

/// Transaction history query parameters
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Apply a signed admin adjustment to a user's balance
///
/// The ledger records who made the change; the audit reason always carries
/// the acting admin's id.
pub async fn adjust_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AdjustBalanceRequest>,
) -> ApiResult<Json<Transaction>> {
    authorization::require_admin(&auth)?;
    req.validate().map_err(super::validation_error)?;

    if req.amount == Decimal::ZERO {
        return Err(ApiError::BadRequest(
            "Adjustment amount cannot be zero".to_string(),
        ));
    }

    let entry =
        ledger::adjust_balance(&state.db, req.user_id, req.amount, req.reason, auth.user_id)
            .await?;

    Ok(Json(entry))
}

/// Aggregate bounty and penalty figures
pub async fn statistics(State(state): State<AppState>) -> ApiResult<Json<BountyStatistics>> {
    let stats = ledger::bounty_statistics(&state.db).await?;
    Ok(Json(stats))
}

/// The caller's ledger history, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let txs = Transaction::list_by_user(&state.db, auth.user_id, limit, offset).await?;

    Ok(Json(txs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_reason_required() {
        let req = AdjustBalanceRequest {
            user_id: Uuid::new_v4(),
            amount: Decimal::new(500, 2),
            reason: "".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
