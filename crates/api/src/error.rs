use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use shared::jwt::JwtError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Invalid or expired OTP")]
    InvalidOtp,

    #[error("Invalid or expired QR session")]
    InvalidSession,

    #[error("{message}")]
    TooFar { message: String, distance: f64 },

    #[error("Attendance already marked for this session")]
    AlreadyMarked,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Device mismatch: {0}")]
    DeviceMismatch(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited")]
    RateLimited { retry_after_secs: u64 },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<f64>,
}

impl ApiError {
    /// Machine readable code carried in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Duplicate(_) => "duplicate",
            ApiError::InvalidOtp => "invalid_otp",
            ApiError::InvalidSession => "invalid_session",
            ApiError::TooFar { .. } => "too_far",
            ApiError::AlreadyMarked => "already_marked",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::DeviceMismatch(_) => "device_mismatch",
            ApiError::Conflict(_) => "conflict",
            ApiError::Timeout => "request_timeout",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::Duplicate(_)
            | ApiError::InvalidOtp
            | ApiError::InvalidSession
            | ApiError::TooFar { .. }
            | ApiError::AlreadyMarked => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::DeviceMismatch(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, distance) = match self {
            ApiError::Validation(msg)
            | ApiError::Duplicate(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::DeviceMismatch(msg)
            | ApiError::Conflict(msg) => (msg, None),
            ApiError::TooFar { message, distance } => (message, Some(distance)),
            ApiError::ServiceUnavailable(msg) => {
                tracing::warn!("Dependency unavailable: {}", msg);
                ("Service temporarily unavailable. Please try again later.".into(), None)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".into(), None)
            }
            ApiError::RateLimited { retry_after_secs } => {
                let body = ErrorBody {
                    error: "Too many requests. Please try again later.".into(),
                    code,
                    distance: None,
                };
                let mut response = (status, Json(body)).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return response;
            }
            other @ (ApiError::InvalidOtp
            | ApiError::InvalidSession
            | ApiError::AlreadyMarked
            | ApiError::Timeout) => {
                (other.to_string(), None)
            }
        };

        let body = ErrorBody {
            error: message,
            code,
            distance,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::Duplicate(msg) => ApiError::Duplicate(msg),
            DomainError::InvalidOtp => ApiError::InvalidOtp,
            DomainError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            DomainError::Forbidden(msg) => ApiError::Forbidden(msg),
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::DeviceMismatch => ApiError::DeviceMismatch(message),
            DomainError::InvalidSession => ApiError::InvalidSession,
            DomainError::TooFar {
                distance_meters, ..
            } => ApiError::TooFar {
                message,
                distance: domain::models::round_distance(distance_meters),
            },
            DomainError::AlreadyMarked => ApiError::AlreadyMarked,
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::Dependency(msg) => ApiError::ServiceUnavailable(msg),
            DomainError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".into()),
            JwtError::EncodingError(msg) | JwtError::InvalidKey(msg) => {
                ApiError::Internal(format!("Token signing failed: {}", msg))
            }
            JwtError::DecodingError(_) | JwtError::InvalidToken => {
                ApiError::Unauthorized("Invalid or missing token".into())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .collect();
        messages.sort();

        let message = match messages.len() {
            0 => "Invalid request".to_string(),
            1 => messages.remove(0),
            _ => messages.join("; "),
        };

        ApiError::Validation(message)
    }
}
