//! `GET`/`PUT /api/settings`.

use crate::{errors::AppError, services::error::GalleryError, state::AppState};
use axum::{Json, body::Bytes, extract::State, response::IntoResponse};
use serde_json::{Value, json};

/// Returns the stored document as-is, `{}` when nothing was saved yet.
pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    Json(Value::Object(state.settings.get().await))
}

/// Replaces the whole document with the request body.
pub async fn update_settings(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let document: Value = serde_json::from_slice(&body)
        .map_err(|err| GalleryError::InvalidInput(format!("malformed settings body: {}", err)))?;
    state.settings.put(document).await?;
    Ok(Json(json!({ "success": true })))
}
