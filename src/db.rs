//! SQLite bootstrap: pool creation and the embedded schema.

use anyhow::{Context, Result};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Open a pool for `db_url`, creating the database file and its parent
/// directory when they do not exist yet.
pub async fn connect(db_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Connecting using raw URL => {}", db_url);

    if !db_url.contains(":memory:") {
        let db_path = db_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:")
            .trim_start_matches("file:");
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        tracing::debug!("Interpreted SQLite path => {}", db_path);

        let db_path_obj = Path::new(db_path);
        if let Some(parent) = db_path_obj.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {:?}", parent))?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }

        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(db_path)
        {
            Ok(_) => tracing::debug!("Database file can be created/opened."),
            Err(e) => tracing::warn!("Failed to open database file manually: {}", e),
        }
    }

    // An in-memory database lives exactly as long as its one connection.
    let options = if db_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = options
        .connect(db_url)
        .await
        .with_context(|| format!("connecting to {}", db_url))?;

    Ok(pool)
}

/// Apply the embedded schema. Every statement is idempotent, so this runs on
/// each start as well as under `--migrate`.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt)
            .execute(db)
            .await
            .context("applying schema statement")?;
    }

    Ok(())
}
