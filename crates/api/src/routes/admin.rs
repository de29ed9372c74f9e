//! Device change review, guarded by the admin key.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use domain::models::{DeviceChangeResponse, ListDeviceChangesResponse, ReviewDeviceChangeRequest};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// The review body is optional. A request without a JSON content type
/// reviews with no reviewer or note; a malformed body is still rejected.
fn optional_review(
    review: Result<Json<ReviewDeviceChangeRequest>, JsonRejection>,
) -> Result<ReviewDeviceChangeRequest, ApiError> {
    match review {
        Ok(Json(review)) => Ok(review),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(ReviewDeviceChangeRequest::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

/// GET /api/admin/device-change-requests
pub async fn list_device_changes(
    State(state): State<AppState>,
) -> Result<Json<ListDeviceChangesResponse>, ApiError> {
    let requests = state.device_changes.list_pending().await?;
    Ok(Json(ListDeviceChangesResponse { requests }))
}

/// POST /api/admin/device-change-requests/:id/approve
pub async fn approve_device_change(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    review: Result<Json<ReviewDeviceChangeRequest>, JsonRejection>,
) -> Result<Json<DeviceChangeResponse>, ApiError> {
    let review = optional_review(review)?;
    review.validate()?;

    let request = state.device_changes.approve(id, &review).await?;
    Ok(Json(DeviceChangeResponse { request }))
}

/// POST /api/admin/device-change-requests/:id/reject
pub async fn reject_device_change(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    review: Result<Json<ReviewDeviceChangeRequest>, JsonRejection>,
) -> Result<Json<DeviceChangeResponse>, ApiError> {
    let review = optional_review(review)?;
    review.validate()?;

    let request = state.device_changes.reject(id, &review).await?;
    Ok(Json(DeviceChangeResponse { request }))
}
