//! Subject entity (database row mapping).

use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the subjects table.
#[derive(Debug, Clone, FromRow)]
pub struct SubjectEntity {
    pub id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub department: String,
    pub semester: i32,
    pub credits: i32,
}

impl From<SubjectEntity> for domain::models::Subject {
    fn from(entity: SubjectEntity) -> Self {
        Self {
            id: entity.id,
            subject_name: entity.subject_name,
            subject_code: entity.subject_code,
            department: entity.department,
            semester: entity.semester,
            credits: entity.credits,
        }
    }
}
