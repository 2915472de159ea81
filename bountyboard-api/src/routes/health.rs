/// Health check endpoint
///
/// `GET /health` reports liveness plus database reachability. Returns 200
/// with `"database": "ok"` when the pool answers, 200 with `"degraded"`
/// when it doesn't; the process being up is itself the liveness signal.

use crate::app::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database = match bountyboard_shared::db::pool::health_check(&state.db).await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!("Health check database probe failed: {}", e);
            "degraded"
        }
    };

    Json(json!({
        "status": "ok",
        "database": database,
        "version": bountyboard_shared::VERSION,
    }))
}
