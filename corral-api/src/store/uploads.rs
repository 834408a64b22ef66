//! Upload session store
//!
//! Sessions are persisted, not process-local: they survive restarts and are
//! visible across horizontally scaled instances. Chunk-index insertion and
//! status transitions are single guarded statements, so concurrent requests
//! for the same upload id race safely without application-level locks.

use corral_common::db::{SessionStatus, UploadSession};
use corral_common::{time, Result};
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Parameters for a fresh upload session.
#[derive(Debug, Clone)]
pub struct NewUploadSession {
    pub filename: String,
    pub total_chunks: i64,
    pub file_size: Option<i64>,
    pub chunk_size: Option<i64>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub project_id: Option<String>,
    pub album_id: Option<String>,
}

#[derive(Clone)]
pub struct UploadStore {
    db: SqlitePool,
}

impl UploadStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a session in state `initialized` under a fresh UUID.
    pub async fn create(&self, new: NewUploadSession) -> Result<UploadSession> {
        let now = time::now();
        let session = UploadSession {
            upload_id: Uuid::new_v4().to_string(),
            filename: new.filename,
            total_chunks: new.total_chunks,
            status: SessionStatus::Initialized,
            file_size: new.file_size,
            chunk_size: new.chunk_size,
            category: new.category,
            tags: Json(new.tags),
            project_id: new.project_id,
            album_id: new.album_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO upload_sessions
                (upload_id, filename, total_chunks, status, file_size, chunk_size,
                 category, tags, project_id, album_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.upload_id)
        .bind(&session.filename)
        .bind(session.total_chunks)
        .bind(session.status)
        .bind(session.file_size)
        .bind(session.chunk_size)
        .bind(&session.category)
        .bind(&session.tags)
        .bind(&session.project_id)
        .bind(&session.album_id)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.db)
        .await?;

        Ok(session)
    }

    pub async fn get(&self, upload_id: &str) -> Result<Option<UploadSession>> {
        Ok(
            sqlx::query_as::<_, UploadSession>("SELECT * FROM upload_sessions WHERE upload_id = ?")
                .bind(upload_id)
                .fetch_optional(&self.db)
                .await?,
        )
    }

    /// Record one received chunk index and move a fresh session into
    /// `uploading`. INSERT OR REPLACE keeps re-uploads idempotent.
    pub async fn record_chunk(&self, upload_id: &str, index: i64, size_bytes: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO upload_chunks (upload_id, chunk_index, size_bytes, received_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(upload_id)
        .bind(index)
        .bind(size_bytes)
        .bind(time::now())
        .execute(&self.db)
        .await?;

        // First chunk moves the session out of `initialized`; the guard keeps
        // terminal states untouched.
        sqlx::query(
            "UPDATE upload_sessions SET status = ?, updated_at = ? WHERE upload_id = ? AND status = ?",
        )
        .bind(SessionStatus::Uploading)
        .bind(time::now())
        .bind(upload_id)
        .bind(SessionStatus::Initialized)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Received chunk indices, ascending.
    pub async fn received_indices(&self, upload_id: &str) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT chunk_index FROM upload_chunks WHERE upload_id = ? ORDER BY chunk_index ASC",
        )
        .bind(upload_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|(i,)| i).collect())
    }

    /// Attempt a guarded status transition.
    ///
    /// The WHERE clause only matches statuses the transition table allows,
    /// so the UPDATE doubles as an atomic compare-and-swap: exactly one
    /// caller wins a complete/cancel race, everyone else sees `false`.
    pub async fn transition(&self, upload_id: &str, to: SessionStatus) -> Result<bool> {
        use SessionStatus::*;
        let sources: Vec<SessionStatus> = [Initialized, Uploading, Completed, Cancelled]
            .into_iter()
            .filter(|s| s.can_transition_to(to))
            .collect();

        let placeholders = vec!["?"; sources.len()].join(", ");
        let sql = format!(
            "UPDATE upload_sessions SET status = ?, updated_at = ? WHERE upload_id = ? AND status IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(to).bind(time::now()).bind(upload_id);
        for source in sources {
            query = query.bind(source);
        }

        let result = query.execute(&self.db).await?;
        Ok(result.rows_affected() == 1)
    }

    /// Drop the received-index rows once staged bytes are gone.
    pub async fn clear_chunks(&self, upload_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM upload_chunks WHERE upload_id = ?")
            .bind(upload_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
