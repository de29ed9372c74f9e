//! Attendance ledger repository.

use async_trait::async_trait;
use domain::models::{AttendanceRecord, NewAttendanceRecord, ReportEntry, StudentAttendanceEntry};
use domain::store::{AttendanceStore, StoreResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AttendanceEntity, ReportRow, StudentHistoryRow};
use crate::error::store_error;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for AttendanceRepository {
    async fn insert_attendance(
        &self,
        record: NewAttendanceRecord,
    ) -> StoreResult<AttendanceRecord> {
        let timer = QueryTimer::new("insert_attendance");
        let result = sqlx::query_as::<_, AttendanceEntity>(
            r#"
            INSERT INTO attendance
                (student_id, teacher_id, subject_id, session_id, student_latitude, student_longitude,
                 distance_meters, is_valid, marked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8)
            RETURNING id, student_id, teacher_id, subject_id, session_id, student_latitude,
                      student_longitude, distance_meters, is_valid, marked_at
            "#,
        )
        .bind(record.student_id)
        .bind(record.teacher_id)
        .bind(record.subject_id)
        .bind(record.session_id)
        .bind(record.student_latitude)
        .bind(record.student_longitude)
        .bind(record.distance_meters)
        .bind(record.marked_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.into())
    }

    async fn attendance_exists(&self, student_id: Uuid, session_id: Uuid) -> StoreResult<bool> {
        let timer = QueryTimer::new("attendance_exists");
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM attendance WHERE student_id = $1 AND session_id = $2)",
        )
        .bind(student_id)
        .bind(session_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)
    }

    async fn report_entries(
        &self,
        teacher_id: Uuid,
        subject_id: Uuid,
    ) -> StoreResult<Vec<ReportEntry>> {
        let timer = QueryTimer::new("attendance_report_entries");
        let result = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT a.id, st.id AS student_id, st.full_name, st.enrollment_number, st.email,
                   a.marked_at, a.distance_meters, sub.subject_name, sub.subject_code
            FROM attendance a
            JOIN students st ON st.id = a.student_id
            JOIN subjects sub ON sub.id = a.subject_id
            WHERE a.teacher_id = $1 AND a.subject_id = $2 AND a.is_valid
            ORDER BY a.marked_at DESC
            "#,
        )
        .bind(teacher_id)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn student_entries(&self, student_id: Uuid) -> StoreResult<Vec<StudentAttendanceEntry>> {
        let timer = QueryTimer::new("student_attendance_entries");
        let result = sqlx::query_as::<_, StudentHistoryRow>(
            r#"
            SELECT a.id, sub.subject_name, sub.subject_code, t.full_name AS teacher_name,
                   a.marked_at, a.distance_meters
            FROM attendance a
            JOIN subjects sub ON sub.id = a.subject_id
            JOIN teachers t ON t.id = a.teacher_id
            WHERE a.student_id = $1 AND a.is_valid
            ORDER BY a.marked_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
