//! Defines routes for the gallery API.
//!
//! ## Structure
//! - **Public**
//!   - `GET    /healthz`, `GET /readyz`
//!   - `POST   /api/login`, `POST /api/logout`
//!   - `GET    /api/photos` — paginated listing (`page`, `pageSize`)
//!   - `GET    /api/photos/{id}`
//!   - `GET    /api/settings`
//!   - `GET    /images/{namespace}/{file}` — image bytes (`size=thumbnail|medium`)
//!
//! - **Admin** (session cookie required)
//!   - `POST   /api/photos` — multipart upload
//!   - `PUT    /api/photos/{id}`, `DELETE /api/photos/{id}`
//!   - `PUT    /api/settings`

use crate::{
    handlers::{
        auth_handlers::{login, logout, require_admin},
        health_handlers::{healthz, readyz},
        image_handlers::get_image,
        photo_handlers::{delete_photo, get_photo, list_photos, update_photo, upload_photo},
        settings_handlers::{get_settings, update_settings},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the full router with state, CORS, request tracing and the upload
/// body limit applied.
pub fn routes(state: AppState, max_upload_bytes: usize) -> Router {
    let admin = Router::new()
        .route("/api/photos", post(upload_photo))
        .route("/api/photos/{id}", put(update_photo).delete(delete_photo))
        .route("/api/settings", put(update_settings))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/photos", get(list_photos))
        .route("/api/photos/{id}", get(get_photo))
        .route("/api/settings", get(get_settings))
        .route("/images/{namespace}/{file}", get(get_image));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    public
        .merge(admin)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
