//! Database initialization
//!
//! Creates the database on first run with the full schema. All statements
//! are idempotent (CREATE TABLE IF NOT EXISTS), so init is safe to call on
//! every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode: concurrent readers with one writer. Chunk uploads for the
    // same session arrive in parallel and all touch upload_chunks.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_leads_table(&pool).await?;
    create_tasks_table(&pool).await?;
    create_catalogue_items_table(&pool).await?;
    create_conversations_table(&pool).await?;
    create_messages_table(&pool).await?;
    create_upload_sessions_table(&pool).await?;
    create_upload_chunks_table(&pool).await?;

    Ok(pool)
}

async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            name TEXT,
            phone TEXT,
            owner_mobile TEXT,
            status TEXT NOT NULL DEFAULT 'New',
            source TEXT,
            notes TEXT,
            extra TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_phone ON leads(phone)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Open',
            due_date TEXT,
            lead_id TEXT,
            extra TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_catalogue_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalogue_items (
            id TEXT PRIMARY KEY,
            upload_id TEXT NOT NULL,
            filename TEXT NOT NULL,
            url TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'completed',
            project_id TEXT,
            album_id TEXT,
            title TEXT,
            description TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_catalogue_project ON catalogue_items(project_id, album_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_conversations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS whatsapp_conversations (
            id TEXT PRIMARY KEY,
            contact TEXT NOT NULL UNIQUE,
            last_message_at TEXT NOT NULL,
            last_message_text TEXT NOT NULL DEFAULT '',
            last_message_dir TEXT NOT NULL,
            unread_count INTEGER NOT NULL DEFAULT 0,
            owner_mobile TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_messages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS whatsapp_messages (
            id TEXT PRIMARY KEY,
            contact TEXT NOT NULL,
            direction TEXT NOT NULL,
            text TEXT,
            media_url TEXT,
            media_type TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_contact ON whatsapp_messages(contact)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_upload_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upload_sessions (
            upload_id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            total_chunks INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'initialized',
            file_size INTEGER,
            chunk_size INTEGER,
            category TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            project_id TEXT,
            album_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_upload_chunks_table(pool: &SqlitePool) -> Result<()> {
    // Primary key (upload_id, chunk_index) gives the received-index set its
    // no-duplicates invariant; INSERT OR REPLACE makes re-upload idempotent.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS upload_chunks (
            upload_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            size_bytes INTEGER NOT NULL,
            received_at TEXT NOT NULL,
            PRIMARY KEY (upload_id, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
