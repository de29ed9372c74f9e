//! Device change request entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{DeviceChangeRequest, DeviceChangeStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the device_change_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceChangeRequestEntity {
    pub id: Uuid,
    pub student_id: Uuid,
    pub current_device_id: String,
    pub new_device_id: String,
    pub reason: Option<String>,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl TryFrom<DeviceChangeRequestEntity> for DeviceChangeRequest {
    type Error = String;

    fn try_from(entity: DeviceChangeRequestEntity) -> Result<Self, Self::Error> {
        let status = DeviceChangeStatus::parse(&entity.status)
            .ok_or_else(|| format!("unknown device change status '{}'", entity.status))?;

        Ok(Self {
            id: entity.id,
            student_id: entity.student_id,
            current_device_id: entity.current_device_id,
            new_device_id: entity.new_device_id,
            reason: entity.reason,
            status,
            reviewed_by: entity.reviewed_by,
            review_note: entity.review_note,
            created_at: entity.created_at,
            reviewed_at: entity.reviewed_at,
        })
    }
}
