//! `GET /images/{namespace}/{file}` — streams image bytes out of the blob
//! store with a cache validator and optional resize directives.

use crate::{
    errors::AppError,
    services::{
        blob_store::BlobStore,
        error::StoreError,
        image_variants::{SizeHint, source_path},
    },
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;

const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000";

const IMAGE_FIT: HeaderName = HeaderName::from_static("x-image-fit");
const IMAGE_WIDTH: HeaderName = HeaderName::from_static("x-image-width");
const IMAGE_HEIGHT: HeaderName = HeaderName::from_static("x-image-height");

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub size: Option<String>,
}

pub async fn get_image(
    State(state): State<AppState>,
    Path((namespace, file_name)): Path<(String, String)>,
    Query(q): Query<ImageQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let path = source_path(&namespace, &file_name)
        .ok_or_else(|| AppError::not_found("Image not found"))?;

    let object = state.photos.blobs().get(&path).await.map_err(|err| match err {
        StoreError::NotFound(_) | StoreError::InvalidPath(_) => {
            AppError::not_found("Image not found")
        }
        other => AppError::internal(other.to_string()),
    })?;

    let etag = format!("\"{}\"", object.attributes.etag);
    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|candidate| candidate.trim() == etag));

    let mut response = if not_modified {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        response
    } else {
        let mut response = Response::new(Body::from_stream(object.body));
        *response.status_mut() = StatusCode::OK;
        if let Ok(length) = HeaderValue::from_str(&object.attributes.size_bytes.to_string()) {
            response.headers_mut().insert(header::CONTENT_LENGTH, length);
        }
        response
    };

    let out = response.headers_mut();
    let content_type = object
        .attributes
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    out.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    out.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_IMMUTABLE),
    );
    if let Ok(value) = HeaderValue::from_str(&etag) {
        out.insert(header::ETAG, value);
    }

    if let Some(resize) = SizeHint::parse(q.size.as_deref()).resize() {
        out.insert(IMAGE_FIT, HeaderValue::from_static(resize.fit));
        out.insert(IMAGE_WIDTH, HeaderValue::from(resize.width));
        if let Some(height) = resize.height {
            out.insert(IMAGE_HEIGHT, HeaderValue::from(height));
        }
    }

    Ok(response)
}
