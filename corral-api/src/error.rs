//! HTTP error surface
//!
//! Every handler boundary converts failures into a flat `{"detail": "..."}`
//! JSON body with the matching status code. No retries, no rollback.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// API error taxonomy
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unknown upload_id / lead_id / task_id -> 404
    #[error("{0}")]
    NotFound(String),

    /// Missing or unparsable request field -> 400
    #[error("{0}")]
    BadRequest(String),

    /// Rejected session transition or incomplete upload -> 409
    #[error("{0}")]
    Conflict(String),

    /// Unexpected failure during file I/O or a database write -> 500
    #[error("{0}")]
    Internal(String),

    /// Shared-library error, mapped by variant
    #[error(transparent)]
    Common(#[from] corral_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Common(corral_common::Error::Database(e))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Common(corral_common::Error::Io(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Common(e) => match e {
                corral_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
                corral_common::Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
                other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
            },
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
