//! Student entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the students table.
#[derive(Debug, Clone, FromRow)]
pub struct StudentEntity {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub enrollment_number: String,
    pub branch: String,
    pub year: i32,
    pub device_id: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<StudentEntity> for domain::models::Student {
    fn from(entity: StudentEntity) -> Self {
        Self {
            id: entity.id,
            full_name: entity.full_name,
            email: entity.email,
            enrollment_number: entity.enrollment_number,
            branch: entity.branch,
            year: entity.year,
            device_id: entity.device_id,
            is_verified: entity.is_verified,
            is_active: entity.is_active,
            last_login_at: entity.last_login_at,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_entity_to_domain() {
        let entity = StudentEntity {
            id: Uuid::new_v4(),
            full_name: "Asha Rao".to_string(),
            email: "asha@example.edu".to_string(),
            enrollment_number: "CS001".to_string(),
            branch: "CSE".to_string(),
            year: 3,
            device_id: "device-1".to_string(),
            is_verified: true,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        };

        let student: domain::models::Student = entity.clone().into();
        assert_eq!(student.id, entity.id);
        assert_eq!(student.device_id, "device-1");
        assert!(student.can_sign_in());
    }
}
