//! Device change request models.
//!
//! A student who replaces their phone files a request; an administrator
//! approves or rejects it. Approval rebinds the account to the new device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Status of a device change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChangeStatus {
    Pending,
    Approved,
    Rejected,
}

impl DeviceChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceChangeStatus::Pending => "pending",
            DeviceChangeStatus::Approved => "approved",
            DeviceChangeStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeviceChangeStatus::Pending),
            "approved" => Some(DeviceChangeStatus::Approved),
            "rejected" => Some(DeviceChangeStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device change request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceChangeRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub current_device_id: String,
    pub new_device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub status: DeviceChangeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Input for creating a request.
#[derive(Debug, Clone)]
pub struct NewDeviceChangeRequest {
    pub student_id: Uuid,
    pub current_device_id: String,
    pub new_device_id: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Administrative decision on a pending request.
#[derive(Debug, Clone)]
pub struct DeviceChangeReview {
    pub reviewed_by: Option<String>,
    pub note: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// Request payload from a student asking to move to a new device.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceChangeRequest {
    #[validate(custom(function = "shared::validation::validate_device_id"))]
    pub new_device_id: String,

    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Request payload for an administrator's review.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDeviceChangeRequest {
    #[validate(length(max = 255, message = "Reviewer must be at most 255 characters"))]
    pub reviewed_by: Option<String>,

    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

/// Response wrapping one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceChangeResponse {
    pub request: DeviceChangeRequest,
}

/// Response listing requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDeviceChangesResponse {
    pub requests: Vec<DeviceChangeRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_via_str() {
        for status in [
            DeviceChangeStatus::Pending,
            DeviceChangeStatus::Approved,
            DeviceChangeStatus::Rejected,
        ] {
            assert_eq!(DeviceChangeStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeviceChangeStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_create_request_validation() {
        let ok = CreateDeviceChangeRequest {
            new_device_id: "new-device".into(),
            reason: Some("Phone replaced".into()),
        };
        assert!(ok.validate().is_ok());

        let blank = CreateDeviceChangeRequest {
            new_device_id: "".into(),
            reason: None,
        };
        assert!(blank.validate().is_err());

        let long_reason = CreateDeviceChangeRequest {
            new_device_id: "new-device".into(),
            reason: Some("x".repeat(501)),
        };
        assert!(long_reason.validate().is_err());
    }
}
