/// Task endpoints
///
/// All task routes sit behind the license gate, so every handler here can
/// assume the caller belongs to a team with a currently valid license.
///
/// `PUT /:id/status` drives the state machine: `review` requests go through
/// [`Task::submit_for_review`], `available` through [`Task::unassign`], and
/// `completed` through the ledger-coupled completion path, which pays the
/// bounty or applies the late penalty in the same transaction as the status
/// flip.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use bountyboard_shared::{
    auth::middleware::AuthContext,
    ledger,
    models::task::{CreateTask, Task, TaskPriority, TaskStatus},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Bounty paid on on-time completion (must be positive)
    pub bounty_amount: Decimal,

    pub deadline: DateTime<Utc>,

    /// 'low', 'medium' or 'high'; defaults to 'medium'
    pub priority: Option<String>,
}

/// Task list query parameters
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    /// Optional status filter ('available', 'in_progress', 'review', 'completed')
    pub status: Option<String>,

    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Status transition request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status
    pub status: String,
}

/// Completion response: the finished task plus the resulting ledger entry
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub task: Task,
    pub on_time: bool,
    pub transaction: bountyboard_shared::models::transaction::Transaction,
}

/// Create a new task in the available pool
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate().map_err(super::validation_error)?;

    if req.bounty_amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest(
            "Bounty amount must be positive".to_string(),
        ));
    }

    let priority = match req.priority.as_deref() {
        Some(s) => TaskPriority::from_str(s)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid priority: {}", s)))?,
        None => TaskPriority::Medium,
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            bounty_amount: req.bounty_amount,
            deadline: req.deadline,
            priority,
            created_by: auth.user_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// List tasks, optionally filtered by status
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            TaskStatus::from_str(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid status: {}", s)))?,
        ),
        None => None,
    };

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let tasks = Task::list(&state.db, status, limit, offset).await?;

    Ok(Json(tasks))
}

/// Single task detail
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Claim an available task for the caller
///
/// Losing a claim race is a client error, not a server fault: the
/// conditional update matched nothing, so respond 400.
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    // Distinguish "no such task" from "not claimable"
    if Task::find_by_id(&state.db, task_id).await?.is_none() {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    let task = Task::assign(&state.db, task_id, auth.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest("Task is not available for assignment".to_string())
        })?;

    Ok(Json(task))
}

/// Drive a task through the state machine
///
/// - `review`: assignee submits in-progress work for sign-off
/// - `available`: releases an in-progress task back to the pool
/// - `completed`: signs off a reviewed task and settles the bounty
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<axum::response::Response> {
    use axum::response::IntoResponse;

    let target = TaskStatus::from_str(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid status: {}", req.status)))?;

    let current = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    // Reject impossible transitions up front; the conditional updates below
    // still guard against races. 'in_progress' is handled by its own arm so
    // the caller gets pointed at the assign endpoint.
    if let Some(status) = TaskStatus::from_str(&current.status) {
        if status.is_terminal() {
            return Err(ApiError::BadRequest(
                "Task is already completed".to_string(),
            ));
        }
        if target != TaskStatus::InProgress && !status.can_transition_to(target) {
            return Err(ApiError::BadRequest(format!(
                "Cannot move task from '{}' to '{}'",
                current.status,
                target.as_str()
            )));
        }
    }

    match target {
        TaskStatus::Review => {
            if current.assigned_to != Some(auth.user_id) {
                return Err(ApiError::Forbidden(
                    "Only the assignee can submit a task for review".to_string(),
                ));
            }
            let task = Task::submit_for_review(&state.db, task_id)
                .await?
                .ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "Cannot move task from '{}' to 'review'",
                        current.status
                    ))
                })?;
            Ok(Json(task).into_response())
        }
        TaskStatus::Available => {
            let task = Task::unassign(&state.db, task_id).await?.ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Cannot move task from '{}' to 'available'",
                    current.status
                ))
            })?;
            Ok(Json(task).into_response())
        }
        TaskStatus::Completed => {
            let outcome = ledger::complete_task(
                &state.db,
                task_id,
                state.config.ledger.penalty_multiplier,
                Utc::now(),
            )
            .await?;

            Ok(Json(CompletionResponse {
                task: outcome.task,
                on_time: outcome.on_time,
                transaction: outcome.entry,
            })
            .into_response())
        }
        TaskStatus::InProgress => Err(ApiError::BadRequest(
            "Use the assign endpoint to claim a task".to_string(),
        )),
    }
}
