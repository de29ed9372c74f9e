//! JSON body extractor whose rejections use the API error shape.

use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::error::ApiError;

/// Drop-in for `axum::Json` on request bodies. Missing fields, wrong types,
/// malformed JSON and a missing content type all answer 400
/// `validation_error` instead of axum's plain-text rejection.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::JsonDataError(_) => {
                format!("Invalid request body: {}", rejection.body_text())
            }
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`".to_string()
            }
            _ => rejection.body_text(),
        };
        tracing::debug!(status = %rejection.status(), "Rejected request body: {}", message);
        ApiError::Validation(message)
    }
}
