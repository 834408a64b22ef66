//! Lead CRUD endpoints. Phone fields pass through the normalizer on both
//! create and update before persistence.

use axum::extract::{Path, Query, State};
use axum::Json;
use corral_common::db::Lead;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::store::LeadInput;
use crate::AppState;

/// POST /api/leads
pub async fn create_lead(
    State(state): State<AppState>,
    Json(input): Json<LeadInput>,
) -> ApiResult<Json<Lead>> {
    Ok(Json(state.leads.create(input).await?))
}

#[derive(Debug, Deserialize)]
pub struct LeadsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/leads?status=&limit=
pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadsQuery>,
) -> ApiResult<Json<Vec<Lead>>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    Ok(Json(state.leads.list(query.status.as_deref(), limit).await?))
}

/// GET /api/leads/:id
pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Lead>> {
    let lead = state
        .leads
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("lead not found: {}", id)))?;
    Ok(Json(lead))
}

/// PUT /api/leads/:id
pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<LeadInput>,
) -> ApiResult<Json<Lead>> {
    Ok(Json(state.leads.update(&id, input).await?))
}

/// DELETE /api/leads/:id
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.leads.delete(&id).await? {
        return Err(ApiError::NotFound(format!("lead not found: {}", id)));
    }
    Ok(Json(json!({ "success": true })))
}
