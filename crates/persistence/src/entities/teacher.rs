//! Teacher entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the teachers table.
#[derive(Debug, Clone, FromRow)]
pub struct TeacherEntity {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub employee_id: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<TeacherEntity> for domain::models::Teacher {
    fn from(entity: TeacherEntity) -> Self {
        Self {
            id: entity.id,
            full_name: entity.full_name,
            email: entity.email,
            department: entity.department,
            employee_id: entity.employee_id,
            is_active: entity.is_active,
            last_login_at: entity.last_login_at,
            created_at: entity.created_at,
        }
    }
}
