//! Pending registration entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the pending_registrations table.
#[derive(Debug, Clone, FromRow)]
pub struct PendingRegistrationEntity {
    pub email: String,
    pub full_name: String,
    pub enrollment_number: String,
    pub branch: String,
    pub year: i32,
    pub device_id: String,
    pub otp_hash: String,
    pub otp_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<PendingRegistrationEntity> for domain::models::PendingRegistration {
    fn from(entity: PendingRegistrationEntity) -> Self {
        Self {
            email: entity.email,
            full_name: entity.full_name,
            enrollment_number: entity.enrollment_number,
            branch: entity.branch,
            year: entity.year,
            device_id: entity.device_id,
            otp_hash: entity.otp_hash,
            otp_expires_at: entity.otp_expires_at,
            created_at: entity.created_at,
        }
    }
}
