//! Request deadline handling.

use axum::BoxError;
use tower::timeout::error::Elapsed;

use crate::error::ApiError;

/// Converts errors raised by the timeout layer into the JSON error shape.
pub async fn handle_timeout_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request exceeded its deadline");
        ApiError::Timeout
    } else {
        ApiError::Internal(format!("Unhandled middleware error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        error_handling::HandleErrorLayer,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use std::time::Duration;
    use tower::{ServiceBuilder, ServiceExt};

    fn app() -> Router {
        Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    "done"
                }),
            )
            .route("/fast", get(|| async { "done" }))
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_timeout_error))
                    .timeout(Duration::from_millis(50)),
            )
    }

    #[tokio::test]
    async fn test_slow_request_gets_json_timeout() {
        let response = app()
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "request_timeout");
        assert_eq!(body["error"], "Request timed out");
    }

    #[tokio::test]
    async fn test_fast_request_passes_through() {
        let response = app()
            .oneshot(Request::get("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_errors_are_internal() {
        let error = handle_timeout_error("boom".into()).await;
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
