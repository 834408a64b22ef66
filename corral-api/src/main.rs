//! corral-api - Corral CRM backend service
//!
//! Serves the chunked catalogue upload protocol, WhatsApp conversation
//! tracking, and lead/task CRUD over one SQLite database.

use anyhow::Result;
use clap::Parser;
use corral_api::{build_router, AppState};
use corral_common::config;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "corral-api", about = "Corral CRM backend service")]
struct Args {
    /// Root data folder (database, served files, upload staging)
    #[arg(long)]
    root_folder: Option<String>,

    /// Bind address
    #[arg(long, env = "CORRAL_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Bind port
    #[arg(long, env = "CORRAL_PORT", default_value_t = 8300)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber before anything else
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Corral CRM backend (corral-api) v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), "CORRAL_ROOT")?;
    std::fs::create_dir_all(&root_folder)?;
    info!("Root folder: {}", root_folder.display());

    let files_dir = config::files_dir(&root_folder);
    let staging_dir = config::staging_dir(&root_folder);
    std::fs::create_dir_all(&files_dir)?;
    std::fs::create_dir_all(&staging_dir)?;

    let db_path = config::database_path(&root_folder);
    let pool = corral_common::db::init_database(&db_path).await?;

    let cors_env = std::env::var("CORS_ORIGINS").ok();
    let cors_origins = config::parse_cors_origins(cors_env.as_deref());
    if let Some(origins) = &cors_origins {
        info!("CORS restricted to {} origin(s)", origins.len());
    }

    let state = AppState::new(pool, files_dir, staging_dir);
    let app = build_router(state, cors_origins);

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!("corral-api listening on http://{}:{}", args.host, args.port);
    info!("Health check: http://{}:{}/health", args.host, args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
