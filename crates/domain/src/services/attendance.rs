//! Attendance marking and reporting.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DomainError, MSG_NOT_ASSIGNED_REPORT};
use crate::models::{
    AttendanceRecord, AttendanceReport, AttendanceStats, NewAttendanceRecord,
    StudentAttendanceEntry,
};
use crate::services::proximity::{Proximity, ProximityValidator};
use crate::services::session::SessionService;
use crate::store::{AttendanceStore, SessionStore, StoreError, Stores, SubjectStore};

#[derive(Clone)]
pub struct AttendanceService {
    sessions: SessionService,
    session_store: Arc<dyn SessionStore>,
    subjects: Arc<dyn SubjectStore>,
    attendance: Arc<dyn AttendanceStore>,
    proximity: ProximityValidator,
}

impl AttendanceService {
    pub fn new(stores: &Stores, sessions: SessionService, proximity: ProximityValidator) -> Self {
        Self {
            sessions,
            session_store: stores.sessions.clone(),
            subjects: stores.subjects.clone(),
            attendance: stores.attendance.clone(),
            proximity,
        }
    }

    /// Records attendance for a scanned session.
    ///
    /// Fails with `InvalidSession`, then `TooFar`, then `AlreadyMarked`, in that
    /// order. The store's (student, session) constraint settles concurrent retries.
    pub async fn mark_attendance(
        &self,
        student_id: Uuid,
        scanned: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<AttendanceRecord, DomainError> {
        let now = Utc::now();
        let session = self.sessions.resolve_open_session(scanned, now).await?;

        let distance_meters = match self
            .proximity
            .check((session.latitude, session.longitude), (latitude, longitude))
        {
            Proximity::Within { distance_meters } => distance_meters,
            Proximity::TooFar {
                distance_meters,
                max_meters,
            } => {
                tracing::info!(
                    student_id = %student_id,
                    session_id = %session.session_id,
                    distance_meters,
                    "Attendance rejected: too far from teacher"
                );
                return Err(DomainError::TooFar {
                    distance_meters,
                    max_meters,
                });
            }
        };

        if self
            .attendance
            .attendance_exists(student_id, session.id)
            .await?
        {
            return Err(DomainError::AlreadyMarked);
        }

        let record = self
            .attendance
            .insert_attendance(NewAttendanceRecord {
                student_id,
                teacher_id: session.teacher_id,
                subject_id: session.subject_id,
                session_id: session.id,
                student_latitude: latitude,
                student_longitude: longitude,
                distance_meters,
                marked_at: now,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => DomainError::AlreadyMarked,
                other => other.into(),
            })?;

        tracing::info!(
            student_id = %student_id,
            session_id = %session.session_id,
            distance_meters,
            "Attendance marked"
        );
        Ok(record)
    }

    /// Report of valid attendance for a subject the teacher is assigned to.
    pub async fn attendance_report(
        &self,
        teacher_id: Uuid,
        subject_id: Uuid,
    ) -> Result<AttendanceReport, DomainError> {
        let subject = self
            .subjects
            .find_assigned_subject(teacher_id, subject_id)
            .await?
            .ok_or_else(|| DomainError::Forbidden(MSG_NOT_ASSIGNED_REPORT.to_string()))?;

        let total_classes = self
            .session_store
            .count_sessions(teacher_id, subject_id)
            .await?;
        let attendance = self.attendance.report_entries(teacher_id, subject_id).await?;
        let stats = AttendanceStats::compute(total_classes, &attendance);

        Ok(AttendanceReport {
            attendance,
            stats,
            subject,
        })
    }

    /// The student's own valid attendance history.
    pub async fn student_attendance(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<StudentAttendanceEntry>, DomainError> {
        Ok(self.attendance.student_entries(student_id).await?)
    }
}
