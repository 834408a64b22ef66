//! Chunked catalogue upload endpoints
//!
//! Protocol: init -> chunk (repeated, any order, re-uploads replace bytes)
//! -> complete | cancel, with `state` available throughout. Completion is
//! rejected unless every chunk 0..total_chunks-1 has arrived, and a session
//! can be finalized or cancelled exactly once.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use corral_common::db::{CatalogueItem, SessionStatus};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::staging::sanitize_filename;
use crate::store::NewUploadSession;
use crate::AppState;

/// Upper bound on chunks per session. `total_chunks` is client-supplied and
/// sized work derives from it, so it cannot be open-ended.
const MAX_TOTAL_CHUNKS: i64 = 10_000;

#[derive(Debug, Deserialize)]
pub struct InitUploadRequest {
    pub filename: String,
    pub file_size: Option<i64>,
    pub chunk_size: Option<i64>,
    pub total_chunks: Option<i64>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub project_id: Option<String>,
    pub album_id: Option<String>,
}

/// POST /api/uploads/catalogue/init
pub async fn init_upload(
    State(state): State<AppState>,
    Json(req): Json<InitUploadRequest>,
) -> ApiResult<Json<Value>> {
    let total_chunks = req
        .total_chunks
        .ok_or_else(|| ApiError::BadRequest("total_chunks is required".to_string()))?;
    if total_chunks < 1 || total_chunks > MAX_TOTAL_CHUNKS {
        return Err(ApiError::BadRequest(format!(
            "total_chunks must be between 1 and {}",
            MAX_TOTAL_CHUNKS
        )));
    }

    let session = state
        .uploads
        .create(NewUploadSession {
            filename: req.filename,
            total_chunks,
            file_size: req.file_size,
            chunk_size: req.chunk_size,
            category: req.category,
            tags: req.tags,
            project_id: req.project_id,
            album_id: req.album_id,
        })
        .await?;

    info!(
        upload_id = %session.upload_id,
        filename = %session.filename,
        total_chunks,
        "Created upload session"
    );

    Ok(Json(json!({
        "success": true,
        "upload_id": session.upload_id,
    })))
}

/// POST /api/uploads/catalogue/chunk
///
/// Multipart form: `upload_id`, `index` (alias `chunk_number`), optional
/// advisory `total`, and the `chunk` file itself.
pub async fn receive_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut upload_id: Option<String> = None;
    let mut index: Option<i64> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("upload_id") => {
                upload_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("invalid upload_id field: {}", e)))?,
                );
            }
            Some("index") | Some("chunk_number") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("invalid index field: {}", e)))?;
                index = Some(text.trim().parse().map_err(|_| {
                    ApiError::BadRequest(format!("chunk index must be an integer, got {:?}", text))
                })?);
            }
            Some("chunk") | Some("file") => {
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("failed to read chunk: {}", e)))?
                        .to_vec(),
                );
            }
            // `total` is advisory; the chunk count is fixed at init.
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    let upload_id =
        upload_id.ok_or_else(|| ApiError::BadRequest("upload_id is required".to_string()))?;
    let session = state
        .uploads
        .get(&upload_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload session not found: {}", upload_id)))?;
    let index = index
        .ok_or_else(|| ApiError::BadRequest("chunk index is required".to_string()))?;
    let data = data.ok_or_else(|| ApiError::BadRequest("chunk file is required".to_string()))?;

    if session.status.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "upload session is {}, cannot accept chunks",
            session.status.as_str()
        )));
    }
    if index < 0 || index >= session.total_chunks {
        return Err(ApiError::BadRequest(format!(
            "chunk index {} out of range 0..{}",
            index, session.total_chunks
        )));
    }

    state.staging.write_chunk(&upload_id, index, &data).await?;
    state
        .uploads
        .record_chunk(&upload_id, index, data.len() as i64)
        .await?;

    Ok(Json(json!({
        "success": true,
        "index": index,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub upload_id: String,
}

/// GET /api/uploads/catalogue/state?upload_id=
pub async fn upload_state(
    State(state): State<AppState>,
    Query(query): Query<StateQuery>,
) -> ApiResult<Json<Value>> {
    let Some(session) = state.uploads.get(&query.upload_id).await? else {
        return Ok(Json(json!({
            "exists": false,
            "parts": [],
            "status": Value::Null,
            "total_chunks": Value::Null,
        })));
    };

    let parts = state.uploads.received_indices(&query.upload_id).await?;

    Ok(Json(json!({
        "exists": true,
        "parts": parts,
        "status": session.status,
        "total_chunks": session.total_chunks,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CompleteUploadRequest {
    pub upload_id: String,
    pub filename: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub project_id: Option<String>,
    pub album_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// POST /api/uploads/catalogue/complete
///
/// Reassembles the staged chunks into one artifact and registers a catalogue
/// item pointing at it. Caller-supplied metadata wins over session metadata.
pub async fn complete_upload(
    State(state): State<AppState>,
    Json(req): Json<CompleteUploadRequest>,
) -> ApiResult<Json<Value>> {
    let session = state
        .uploads
        .get(&req.upload_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload session not found: {}", req.upload_id)))?;

    let indices = state.uploads.received_indices(&req.upload_id).await?;
    if let Some(first_missing) = first_missing_index(&indices, session.total_chunks) {
        return Err(ApiError::Conflict(format!(
            "incomplete upload: {} of {} chunks missing (first missing index {})",
            session.total_chunks - indices.len() as i64,
            session.total_chunks,
            first_missing
        )));
    }

    // Claim the session before touching the filesystem: exactly one caller
    // may finalize, repeats and cancelled sessions get 409.
    if !state
        .uploads
        .transition(&req.upload_id, SessionStatus::Completed)
        .await?
    {
        warn!(upload_id = %req.upload_id, "Rejected complete on finalized session");
        return Err(ApiError::Conflict(format!(
            "upload session {} is already completed or cancelled",
            req.upload_id
        )));
    }

    let display_name = sanitize_filename(req.filename.as_deref().unwrap_or(&session.filename));
    let final_name = format!("{}_{}", session.upload_id, display_name);
    let dest = state.files_dir.join("catalogue").join(&final_name);

    let bytes_written = state.staging.assemble(&req.upload_id, &indices, &dest).await?;

    let item = CatalogueItem {
        id: Uuid::new_v4().to_string(),
        upload_id: session.upload_id.clone(),
        filename: display_name,
        url: format!("/api/files/catalogue/{}", final_name),
        status: "completed".to_string(),
        project_id: req.project_id.or(session.project_id),
        album_id: req.album_id.or(session.album_id),
        title: req.title,
        description: req.description,
        created_at: corral_common::time::now(),
    };
    state.catalogue.insert(&item).await?;

    // Staged bytes are no longer needed; cleanup failure is not fatal.
    if let Err(e) = state.staging.remove(&req.upload_id).await {
        warn!(upload_id = %req.upload_id, error = %e, "Failed to remove staging directory");
    }
    state.uploads.clear_chunks(&req.upload_id).await?;

    info!(
        upload_id = %req.upload_id,
        url = %item.url,
        bytes = bytes_written,
        "Finalized upload"
    );

    Ok(Json(json!({
        "success": true,
        "file": item,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CancelUploadRequest {
    pub upload_id: String,
}

/// POST /api/uploads/catalogue/cancel
pub async fn cancel_upload(
    State(state): State<AppState>,
    Json(req): Json<CancelUploadRequest>,
) -> ApiResult<Json<Value>> {
    state
        .uploads
        .get(&req.upload_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload session not found: {}", req.upload_id)))?;

    if !state
        .uploads
        .transition(&req.upload_id, SessionStatus::Cancelled)
        .await?
    {
        return Err(ApiError::Conflict(format!(
            "upload session {} is already completed or cancelled",
            req.upload_id
        )));
    }

    state.staging.remove(&req.upload_id).await?;
    state.uploads.clear_chunks(&req.upload_id).await?;

    info!(upload_id = %req.upload_id, "Cancelled upload session");

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub project_id: Option<String>,
    pub album_id: Option<String>,
}

/// GET /api/uploads/catalogue/list?project_id=&album_id=
pub async fn list_catalogues(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let items = state
        .catalogue
        .list(query.project_id.as_deref(), query.album_id.as_deref())
        .await?;

    Ok(Json(json!({ "catalogues": items })))
}

/// First index in 0..total absent from the received list.
///
/// `received` is sorted ascending, duplicate-free and in range (the chunk
/// endpoint enforces all three), so the first gap is the first position
/// where value and position disagree. Walks the received list only; the
/// range itself is never materialized.
fn first_missing_index(received: &[i64], total: i64) -> Option<i64> {
    for (position, index) in received.iter().enumerate() {
        if *index != position as i64 {
            return Some(position as i64);
        }
    }
    if (received.len() as i64) < total {
        Some(received.len() as i64)
    } else {
        None
    }
}
