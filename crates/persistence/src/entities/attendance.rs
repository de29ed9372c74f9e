//! Attendance entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the attendance table.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceEntity {
    pub id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub session_id: Uuid,
    pub student_latitude: f64,
    pub student_longitude: f64,
    pub distance_meters: f64,
    pub is_valid: bool,
    pub marked_at: DateTime<Utc>,
}

impl From<AttendanceEntity> for domain::models::AttendanceRecord {
    fn from(entity: AttendanceEntity) -> Self {
        Self {
            id: entity.id,
            student_id: entity.student_id,
            teacher_id: entity.teacher_id,
            subject_id: entity.subject_id,
            session_id: entity.session_id,
            student_latitude: entity.student_latitude,
            student_longitude: entity.student_longitude,
            distance_meters: entity.distance_meters,
            is_valid: entity.is_valid,
            marked_at: entity.marked_at,
        }
    }
}

/// Report row: attendance joined with student and subject.
#[derive(Debug, Clone, FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub full_name: String,
    pub enrollment_number: String,
    pub email: String,
    pub marked_at: DateTime<Utc>,
    pub distance_meters: f64,
    pub subject_name: String,
    pub subject_code: String,
}

impl From<ReportRow> for domain::models::ReportEntry {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            full_name: row.full_name,
            enrollment_number: row.enrollment_number,
            email: row.email,
            marked_at: row.marked_at,
            distance_from_teacher: row.distance_meters,
            subject_name: row.subject_name,
            subject_code: row.subject_code,
        }
    }
}

/// History row: attendance joined with subject and teacher.
#[derive(Debug, Clone, FromRow)]
pub struct StudentHistoryRow {
    pub id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub teacher_name: String,
    pub marked_at: DateTime<Utc>,
    pub distance_meters: f64,
}

impl From<StudentHistoryRow> for domain::models::StudentAttendanceEntry {
    fn from(row: StudentHistoryRow) -> Self {
        Self {
            id: row.id,
            subject_name: row.subject_name,
            subject_code: row.subject_code,
            teacher_name: row.teacher_name,
            marked_at: row.marked_at,
            distance_from_teacher: row.distance_meters,
            attendance_date: row.marked_at.date_naive(),
        }
    }
}
