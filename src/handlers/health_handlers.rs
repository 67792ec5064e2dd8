//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness, no I/O
//! - GET /readyz   -> readiness of the metadata database and the blob directory

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::SqlitePool;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// 200 when every check passes, 503 otherwise. The body lists each check.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert("metadata", probe_database(&state.db).await);
    checks.insert("blobs", probe_directory(&state.storage_dir).await);

    let ready = checks.values().all(|c| c.ok);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if ready { "ok" } else { "error" },
            checks,
        }),
    )
}

async fn probe_database(db: &SqlitePool) -> CheckStatus {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(db).await {
        Ok(1) => CheckStatus::passed(),
        Ok(v) => CheckStatus::failed(format!("unexpected result: {}", v)),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    }
}

/// Write, read back and remove a scratch file.
async fn probe_directory(dir: &Path) -> CheckStatus {
    let tmp_path = dir.join(format!(".readyz-{}", Uuid::new_v4()));

    if let Err(e) = fs::write(&tmp_path, b"readyz").await {
        return CheckStatus::failed(format!("could not write tmp file: {}", e));
    }

    let outcome = match fs::read(&tmp_path).await {
        Ok(bytes) if bytes == b"readyz" => CheckStatus::passed(),
        Ok(_) => CheckStatus::failed("file content mismatch"),
        Err(e) => CheckStatus::failed(format!("could not read tmp file: {}", e)),
    };

    match fs::remove_file(&tmp_path).await {
        Err(e) if outcome.ok => CheckStatus {
            ok: true,
            error: Some(format!("could not remove tmp file: {}", e)),
        },
        _ => outcome,
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn passed() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}
