//! Task CRUD endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use corral_common::db::Task;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::store::TaskInput;
use crate::AppState;

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Json(input): Json<TaskInput>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.create(input).await?))
}

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/tasks?status=&limit=
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    Ok(Json(state.tasks.list(query.status.as_deref(), limit).await?))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state
        .tasks
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task not found: {}", id)))?;
    Ok(Json(task))
}

/// PUT /api/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TaskInput>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.update(&id, input).await?))
}

/// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.tasks.delete(&id).await? {
        return Err(ApiError::NotFound(format!("task not found: {}", id)));
    }
    Ok(Json(json!({ "success": true })))
}
