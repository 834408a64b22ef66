//! corral-api library - Corral CRM HTTP service
//!
//! Chunked catalogue uploads with server-side reassembly, WhatsApp-style
//! conversation tracking, and lead/task CRUD over SQLite.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod staging;
pub mod store;

use staging::ChunkStaging;
use store::{CatalogueStore, ConversationStore, LeadStore, TaskStore, UploadStore};

/// Largest accepted request body. Chunk uploads dominate; everything else
/// is small JSON.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub uploads: UploadStore,
    pub catalogue: CatalogueStore,
    pub conversations: ConversationStore,
    pub leads: LeadStore,
    pub tasks: TaskStore,
    pub staging: ChunkStaging,
    /// Directory served statically at /api/files
    pub files_dir: PathBuf,
}

impl AppState {
    pub fn new(db: SqlitePool, files_dir: PathBuf, staging_root: PathBuf) -> Self {
        Self {
            uploads: UploadStore::new(db.clone()),
            catalogue: CatalogueStore::new(db.clone()),
            conversations: ConversationStore::new(db.clone()),
            leads: LeadStore::new(db.clone()),
            tasks: TaskStore::new(db),
            staging: ChunkStaging::new(staging_root),
            files_dir,
        }
    }
}

/// Build application router
///
/// `cors_origins`: explicit origin allowlist, or `None` for permissive CORS.
pub fn build_router(state: AppState, cors_origins: Option<Vec<String>>) -> Router {
    let cors = match cors_origins {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    let files = ServeDir::new(&state.files_dir);

    Router::new()
        // Chunked catalogue uploads
        .route("/api/uploads/catalogue/init", post(api::uploads::init_upload))
        .route("/api/uploads/catalogue/chunk", post(api::uploads::receive_chunk))
        .route("/api/uploads/catalogue/state", get(api::uploads::upload_state))
        .route("/api/uploads/catalogue/complete", post(api::uploads::complete_upload))
        .route("/api/uploads/catalogue/cancel", post(api::uploads::cancel_upload))
        .route("/api/uploads/catalogue/list", get(api::uploads::list_catalogues))

        // WhatsApp messaging
        .route("/api/whatsapp/webhook", post(api::whatsapp::webhook))
        .route("/api/whatsapp/send", post(api::whatsapp::send_text))
        .route("/api/whatsapp/send_media", post(api::whatsapp::send_media))
        .route("/api/whatsapp/conversations", get(api::whatsapp::list_conversations))
        .route("/api/whatsapp/conversations/:contact/read", post(api::whatsapp::mark_read))
        .route("/api/whatsapp/session_status", get(api::whatsapp::session_status))

        // Leads
        .route("/api/leads", post(api::leads::create_lead).get(api::leads::list_leads))
        .route(
            "/api/leads/:id",
            get(api::leads::get_lead)
                .put(api::leads::update_lead)
                .delete(api::leads::delete_lead),
        )

        // Tasks
        .route("/api/tasks", post(api::tasks::create_task).get(api::tasks::list_tasks))
        .route(
            "/api/tasks/:id",
            get(api::tasks::get_task)
                .put(api::tasks::update_task)
                .delete(api::tasks::delete_task),
        )

        // Assembled catalogue artifacts
        .nest_service("/api/files", files)

        .merge(api::health::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
