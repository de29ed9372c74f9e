//! QR session entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the qr_sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct QrSessionEntity {
    pub id: Uuid,
    pub session_id: String,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<QrSessionEntity> for domain::models::AttendanceSession {
    fn from(entity: QrSessionEntity) -> Self {
        Self {
            id: entity.id,
            session_id: entity.session_id,
            teacher_id: entity.teacher_id,
            subject_id: entity.subject_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
            is_active: entity.is_active,
        }
    }
}

/// Active session joined with its subject and attendance count.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSessionRow {
    pub id: Uuid,
    pub session_id: String,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub student_count: i64,
}

impl From<ActiveSessionRow> for domain::models::ActiveSessionSummary {
    fn from(row: ActiveSessionRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            subject_code: row.subject_code,
            created_at: row.created_at,
            expires_at: row.expires_at,
            student_count: row.student_count,
        }
    }
}
