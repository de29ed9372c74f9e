//! Store traits implemented by the persistence layer.
//!
//! Services depend only on these traits. Every method that must be atomic is
//! a single trait call so the backend can wrap it in one transaction or one
//! conditional statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::jwt::Role;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ActiveSessionSummary, AttendanceRecord, AttendanceSession, DeviceChangeRequest,
    DeviceChangeReview, LoginOtp, NewAttendanceRecord, NewDeviceChangeRequest, NewSession,
    PendingRegistration, ReportEntry, Student, StudentAttendanceEntry, Subject, Teacher,
};

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. Carries the constraint name.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The backend could not be reached in time.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One-time passcode persistence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts or overwrites the pending registration for its email.
    async fn upsert_pending_registration(&self, pending: PendingRegistration) -> StoreResult<()>;

    async fn find_pending_registration(
        &self,
        email: &str,
    ) -> StoreResult<Option<PendingRegistration>>;

    /// Consumes a matching, unexpired pending registration and creates the
    /// verified student in one transaction.
    ///
    /// Returns `Ok(None)` when no pending row matches. A clash with an existing
    /// account surfaces as `UniqueViolation` and leaves the pending row intact.
    async fn promote_registration(
        &self,
        email: &str,
        otp_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Student>>;

    /// Inserts or overwrites the login passcode for (email, user type).
    async fn upsert_login_otp(&self, otp: LoginOtp) -> StoreResult<()>;

    /// Deletes the login passcode if it matches and is unexpired.
    ///
    /// When `device_id` is given it must equal the device recorded at issuance.
    /// Returns whether a row was consumed; concurrent calls for one code
    /// consume it at most once.
    async fn consume_login_otp(
        &self,
        email: &str,
        user_type: Role,
        otp_hash: &str,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Removes expired pending registrations and login passcodes.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn find_student_by_id(&self, id: Uuid) -> StoreResult<Option<Student>>;

    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>>;

    async fn find_student_by_device(&self, device_id: &str) -> StoreResult<Option<Student>>;

    /// Whether a verified student already holds this email or enrollment number.
    async fn identity_taken(&self, email: &str, enrollment_number: &str) -> StoreResult<bool>;

    async fn record_student_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait TeacherStore: Send + Sync {
    async fn find_teacher_by_id(&self, id: Uuid) -> StoreResult<Option<Teacher>>;

    async fn find_active_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>>;

    async fn record_teacher_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait SubjectStore: Send + Sync {
    /// Subjects assigned to the teacher, ordered by name.
    async fn list_subjects_for_teacher(&self, teacher_id: Uuid) -> StoreResult<Vec<Subject>>;

    /// The subject if the teacher is assigned to it.
    async fn find_assigned_subject(
        &self,
        teacher_id: Uuid,
        subject_id: Uuid,
    ) -> StoreResult<Option<Subject>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Deactivates any active session of the pair and inserts the new one in
    /// one transaction.
    async fn create_superseding(&self, session: NewSession) -> StoreResult<AttendanceSession>;

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<AttendanceSession>>;

    /// Active, unexpired sessions with live attendance counts, newest first.
    async fn list_active_sessions(
        &self,
        teacher_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<ActiveSessionSummary>>;

    /// Number of sessions ever created for the pair.
    async fn count_sessions(&self, teacher_id: Uuid, subject_id: Uuid) -> StoreResult<i64>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Inserts a record. A second record for the same (student, session)
    /// fails with `UniqueViolation`.
    async fn insert_attendance(&self, record: NewAttendanceRecord)
        -> StoreResult<AttendanceRecord>;

    async fn attendance_exists(&self, student_id: Uuid, session_id: Uuid) -> StoreResult<bool>;

    /// Valid records for the pair joined with student details, newest first.
    async fn report_entries(
        &self,
        teacher_id: Uuid,
        subject_id: Uuid,
    ) -> StoreResult<Vec<ReportEntry>>;

    /// Valid records of one student joined with subject and teacher, newest first.
    async fn student_entries(&self, student_id: Uuid) -> StoreResult<Vec<StudentAttendanceEntry>>;
}

#[async_trait]
pub trait DeviceChangeStore: Send + Sync {
    /// Creates a pending request. A second pending request for the same
    /// student fails with `UniqueViolation`.
    async fn create_device_change(
        &self,
        request: NewDeviceChangeRequest,
    ) -> StoreResult<DeviceChangeRequest>;

    async fn find_device_change(&self, id: Uuid) -> StoreResult<Option<DeviceChangeRequest>>;

    async fn find_pending_device_change(
        &self,
        student_id: Uuid,
    ) -> StoreResult<Option<DeviceChangeRequest>>;

    /// Pending requests, oldest first.
    async fn list_pending_device_changes(&self) -> StoreResult<Vec<DeviceChangeRequest>>;

    /// Marks a pending request approved and rebinds the student's device in one
    /// transaction. Returns `Ok(None)` when the request is not pending.
    async fn approve_device_change(
        &self,
        id: Uuid,
        review: DeviceChangeReview,
    ) -> StoreResult<Option<DeviceChangeRequest>>;

    /// Marks a pending request rejected. Returns `Ok(None)` when not pending.
    async fn reject_device_change(
        &self,
        id: Uuid,
        review: DeviceChangeReview,
    ) -> StoreResult<Option<DeviceChangeRequest>>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}

/// Bundle of store handles shared by services.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub students: Arc<dyn StudentStore>,
    pub teachers: Arc<dyn TeacherStore>,
    pub subjects: Arc<dyn SubjectStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub device_changes: Arc<dyn DeviceChangeStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
