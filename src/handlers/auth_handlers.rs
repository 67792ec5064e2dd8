//! Login/logout and the admin gate placed in front of mutating routes.

use crate::{
    errors::AppError,
    services::{
        error::GalleryError,
        session::{SESSION_COOKIE, SESSION_MAX_AGE, cookie_value},
    },
    state::AppState,
};
use axum::{
    Form, Json,
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

fn session_cookie(token: &str, max_age: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

fn with_cookie(cookie: String) -> Result<Response, AppError> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|err| AppError::internal(format!("invalid session cookie: {}", err)))?;
    let mut response = Json(json!({ "success": true })).into_response();
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(response)
}

/// `POST /api/login` — form field `password`.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match state.sessions.issue(&form.password) {
        Some(token) => {
            info!("admin session issued");
            with_cookie(session_cookie(&token, SESSION_MAX_AGE))
        }
        None => {
            warn!("rejected admin login");
            Err(AppError::unauthorized("Invalid password"))
        }
    }
}

/// `POST /api/logout` — expires the cookie.
pub async fn logout() -> Result<Response, AppError> {
    with_cookie(session_cookie("", 0))
}

/// Middleware: only requests carrying a valid session cookie get through.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| cookie_value(v, SESSION_COOKIE))
        .any(|token| state.sessions.validate(token));

    if !authorized {
        return Err(GalleryError::Unauthorized.into());
    }
    Ok(next.run(request).await)
}
