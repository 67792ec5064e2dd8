use anyhow::Result;
use photo_gallery::{
    config::{self, DEFAULT_ADMIN_PASSWORD},
    db, routes,
    services::session::SharedSecretSession,
    state::AppState,
};
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting photo-gallery with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir).await?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite + schema ---
    let pool = db::connect(&cfg.database_url).await?;
    db::run_migrations(&pool).await?;

    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    if cfg.admin_password == DEFAULT_ADMIN_PASSWORD {
        tracing::warn!("GALLERY_ADMIN_PASSWORD is not set; using the built-in default password");
    }

    // --- Initialize core services ---
    let sessions = Arc::new(SharedSecretSession::new(cfg.admin_password.clone()));
    let state = AppState::new(Arc::new(pool), cfg.storage_dir.clone(), sessions);

    // --- Build router ---
    let app = routes::routes::routes(state, cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
