//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;

/// Free-form attributes carried alongside the typed fields of a CRM record.
///
/// Front-ends attach arbitrary extra keys to leads and tasks; those land here
/// instead of being silently dropped or accepted as fully untyped payloads.
pub type ExtraFields = BTreeMap<String, serde_json::Value>;

/// Lifecycle state of a chunked upload session.
///
/// Moves strictly forward: `initialized -> uploading -> {completed|cancelled}`.
/// Transitions are enforced with guarded UPDATEs (compare-and-swap on status),
/// so a session can be finalized or cancelled exactly once even under
/// concurrent requests or multiple server instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SessionStatus {
    Initialized,
    Uploading,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Initialized => "initialized",
            SessionStatus::Uploading => "uploading",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Allowed-transition table. Forward only, terminal states are sinks.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Initialized, Uploading)
                | (Initialized, Completed)
                | (Initialized, Cancelled)
                | (Uploading, Completed)
                | (Uploading, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

/// Direction of a WhatsApp-style message relative to the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// One in-progress chunked catalogue upload.
///
/// Persisted in `upload_sessions`; received chunk indices live in the
/// `upload_chunks` table whose primary key (upload_id, chunk_index) gives
/// set semantics.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadSession {
    pub upload_id: String,
    pub filename: String,
    pub total_chunks: i64,
    pub status: SessionStatus,
    pub file_size: Option<i64>,
    pub chunk_size: Option<i64>,
    pub category: Option<String>,
    pub tags: Json<Vec<String>>,
    pub project_id: Option<String>,
    pub album_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A finalized, publicly retrievable catalogue artifact. Insert-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogueItem {
    pub id: String,
    pub upload_id: String,
    pub filename: String,
    pub url: String,
    pub status: String,
    pub project_id: Option<String>,
    pub album_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Latest-state summary of a message thread with one contact.
///
/// Keyed uniquely by `contact` in canonical phone form.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: String,
    pub contact: String,
    pub last_message_at: DateTime<Utc>,
    pub last_message_text: String,
    pub last_message_dir: Direction,
    pub unread_count: i64,
    pub owner_mobile: Option<String>,
}

/// Append-only record of one inbound or outbound message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub contact: String,
    pub direction: Direction,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A CRM lead. Phone fields are canonical (`+91XXXXXXXXXX`) on disk.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lead {
    pub id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub owner_mobile: Option<String>,
    pub status: String,
    pub source: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Json<ExtraFields>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A CRM task, optionally linked to a lead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: String,
    pub due_date: Option<String>,
    pub lead_id: Option<String>,
    #[serde(flatten)]
    pub extra: Json<ExtraFields>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
