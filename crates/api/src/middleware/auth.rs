//! Administrative route guard.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::crypto::constant_time_eq;

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the shared administrative key.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Requires `X-Admin-Key` to match the configured key. With no key
/// configured the admin routes are closed.
pub async fn require_admin(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let expected = state.config.security.admin_api_key.as_str();
    if expected.is_empty() {
        return ApiError::Forbidden("Administrative access is disabled".into()).into_response();
    }

    let provided = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if constant_time_eq(key, expected) => next.run(req).await,
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "Rejected invalid admin key");
            ApiError::Unauthorized("Invalid admin key".into()).into_response()
        }
        None => ApiError::Unauthorized("Missing admin key".into()).into_response(),
    }
}
