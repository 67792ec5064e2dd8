//! HTTP handlers for photo records: listing, upload, edit and delete.
//! Storage consistency is the repository's job; these only translate
//! between HTTP and the core.

use crate::{
    errors::AppError,
    models::photo::{NewPhoto, PhotoUpdate},
    services::{error::GalleryError, pagination::paginate},
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Query params accepted by `GET /api/photos`. Kept as raw strings so bad
/// values fall back to defaults instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ListPhotosQuery {
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

fn positive(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
}

/// `GET /api/photos?page=&pageSize=`
pub async fn list_photos(
    State(state): State<AppState>,
    Query(q): Query<ListPhotosQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = positive(q.page.as_deref()).unwrap_or(1);
    let page_size = match positive(q.page_size.as_deref()) {
        Some(size) => size,
        None => state.settings.resolved().await.page_size,
    };

    let records = state.photos.list_all().await?;
    debug!("listing page {} of {} photos", page, records.len());
    Ok(Json(paginate(records, page, page_size)))
}

/// `GET /api/photos/{id}`
pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.photos.read(&id).await?;
    Ok(Json(record))
}

/// `POST /api/photos` — multipart with `file`, optional `title` and
/// `description`.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut title = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
                file = Some((original_name, mime_type, bytes));
            }
            "title" => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AppError::bad_request(err.body_text()))?,
                );
            }
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AppError::bad_request(err.body_text()))?,
                );
            }
            _ => {}
        }
    }

    let (original_name, mime_type, bytes) =
        file.ok_or_else(|| GalleryError::InvalidInput("No file uploaded".into()))?;

    let record = state
        .photos
        .create(NewPhoto {
            bytes,
            mime_type,
            original_name,
            title,
            description,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "photoId": record.id,
            "metadata": record,
        })),
    ))
}

/// `PUT /api/photos/{id}` — JSON body with optional `title`/`description`.
pub async fn update_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let changes: PhotoUpdate = serde_json::from_slice(&body)
        .map_err(|err| GalleryError::InvalidInput(format!("malformed update body: {}", err)))?;

    let record = state.photos.update(&id, changes).await?;
    Ok(Json(json!({ "success": true, "metadata": record })))
}

/// `DELETE /api/photos/{id}`
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.photos.delete(&id).await?;
    Ok(Json(json!({ "success": true })))
}
