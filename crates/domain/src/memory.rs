//! In-memory implementation of every store trait.
//!
//! Enforces the same uniqueness rules as the PostgreSQL schema and reports
//! violations with the same constraint names. A single mutex guards all
//! state, so every trait call is atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::crypto::constant_time_eq;
use shared::jwt::Role;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    ActiveSessionSummary, AttendanceRecord, AttendanceSession, DeviceChangeRequest,
    DeviceChangeReview, DeviceChangeStatus, LoginOtp, NewAttendanceRecord,
    NewDeviceChangeRequest, NewSession, PendingRegistration, ReportEntry, Student,
    StudentAttendanceEntry, Subject, Teacher,
};
use crate::store::{
    AttendanceStore, CredentialStore, DeviceChangeStore, SessionStore, StoreError, StoreHealth,
    StoreResult, Stores, StudentStore, SubjectStore, TeacherStore,
};

pub const STUDENTS_EMAIL_KEY: &str = "students_email_key";
pub const STUDENTS_ENROLLMENT_KEY: &str = "students_enrollment_number_key";
pub const STUDENTS_DEVICE_KEY: &str = "students_device_id_key";
pub const ATTENDANCE_STUDENT_SESSION_KEY: &str = "attendance_student_id_session_id_key";
pub const DEVICE_CHANGE_PENDING_KEY: &str = "device_change_requests_one_pending_idx";

#[derive(Default)]
struct Inner {
    students: HashMap<Uuid, Student>,
    teachers: HashMap<Uuid, Teacher>,
    subjects: HashMap<Uuid, Subject>,
    assignments: HashSet<(Uuid, Uuid)>,
    pending: HashMap<String, PendingRegistration>,
    login_otps: HashMap<(String, Role), LoginOtp>,
    sessions: Vec<AttendanceSession>,
    attendance: Vec<AttendanceRecord>,
    device_changes: Vec<DeviceChangeRequest>,
}

impl Inner {
    /// First unique constraint `candidate` would violate, ignoring `except`.
    fn student_conflict(&self, candidate: &Student, except: Option<Uuid>) -> Option<&'static str> {
        self.students
            .values()
            .filter(|s| Some(s.id) != except)
            .find_map(|s| {
                if s.email == candidate.email {
                    Some(STUDENTS_EMAIL_KEY)
                } else if s.enrollment_number == candidate.enrollment_number {
                    Some(STUDENTS_ENROLLMENT_KEY)
                } else if s.device_id == candidate.device_id {
                    Some(STUDENTS_DEVICE_KEY)
                } else {
                    None
                }
            })
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes this store through every trait.
    pub fn stores(self: Arc<Self>) -> Stores {
        Stores {
            credentials: self.clone(),
            students: self.clone(),
            teachers: self.clone(),
            subjects: self.clone(),
            sessions: self.clone(),
            attendance: self.clone(),
            device_changes: self.clone(),
            health: self,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seeds a verified, active student.
    pub fn add_student(
        &self,
        full_name: &str,
        email: &str,
        enrollment_number: &str,
        device_id: &str,
    ) -> Student {
        let student = Student {
            id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            enrollment_number: enrollment_number.to_string(),
            branch: "CSE".to_string(),
            year: 1,
            device_id: device_id.to_string(),
            is_verified: true,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        };
        self.inner().students.insert(student.id, student.clone());
        student
    }

    pub fn set_student_active(&self, id: Uuid, active: bool) {
        if let Some(s) = self.inner().students.get_mut(&id) {
            s.is_active = active;
        }
    }

    /// Seeds an active teacher.
    pub fn add_teacher(
        &self,
        full_name: &str,
        email: &str,
        department: &str,
        employee_id: &str,
    ) -> Teacher {
        let teacher = Teacher {
            id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            department: department.to_string(),
            employee_id: employee_id.to_string(),
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        };
        self.inner().teachers.insert(teacher.id, teacher.clone());
        teacher
    }

    pub fn set_teacher_active(&self, id: Uuid, active: bool) {
        if let Some(t) = self.inner().teachers.get_mut(&id) {
            t.is_active = active;
        }
    }

    pub fn add_subject(
        &self,
        subject_name: &str,
        subject_code: &str,
        department: &str,
        semester: i32,
        credits: i32,
    ) -> Subject {
        let subject = Subject {
            id: Uuid::new_v4(),
            subject_name: subject_name.to_string(),
            subject_code: subject_code.to_string(),
            department: department.to_string(),
            semester,
            credits,
        };
        self.inner().subjects.insert(subject.id, subject.clone());
        subject
    }

    pub fn assign_subject(&self, teacher_id: Uuid, subject_id: Uuid) {
        self.inner().assignments.insert((teacher_id, subject_id));
    }

    pub fn student_snapshot(&self, id: Uuid) -> Option<Student> {
        self.inner().students.get(&id).cloned()
    }

    pub fn session_snapshot(&self, session_id: &str) -> Option<AttendanceSession> {
        self.inner()
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned()
    }

    /// Moves a session's expiry into the past.
    pub fn expire_session(&self, session_id: &str) {
        let now = Utc::now();
        if let Some(s) = self
            .inner()
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
        {
            s.expires_at = now;
        }
    }

    pub fn attendance_count(&self) -> usize {
        self.inner().attendance.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn upsert_pending_registration(&self, pending: PendingRegistration) -> StoreResult<()> {
        self.inner().pending.insert(pending.email.clone(), pending);
        Ok(())
    }

    async fn find_pending_registration(
        &self,
        email: &str,
    ) -> StoreResult<Option<PendingRegistration>> {
        Ok(self.inner().pending.get(email).cloned())
    }

    async fn promote_registration(
        &self,
        email: &str,
        otp_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Student>> {
        let mut inner = self.inner();

        let pending = match inner.pending.get(email) {
            Some(p) if !p.is_expired(now) && constant_time_eq(&p.otp_hash, otp_hash) => p.clone(),
            _ => return Ok(None),
        };

        let student = Student {
            id: Uuid::new_v4(),
            full_name: pending.full_name,
            email: pending.email,
            enrollment_number: pending.enrollment_number,
            branch: pending.branch,
            year: pending.year,
            device_id: pending.device_id,
            is_verified: true,
            is_active: true,
            last_login_at: None,
            created_at: now,
        };

        if let Some(constraint) = inner.student_conflict(&student, None) {
            return Err(StoreError::UniqueViolation(constraint.to_string()));
        }

        inner.pending.remove(email);
        inner.students.insert(student.id, student.clone());
        Ok(Some(student))
    }

    async fn upsert_login_otp(&self, otp: LoginOtp) -> StoreResult<()> {
        self.inner()
            .login_otps
            .insert((otp.email.clone(), otp.user_type), otp);
        Ok(())
    }

    async fn consume_login_otp(
        &self,
        email: &str,
        user_type: Role,
        otp_hash: &str,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut inner = self.inner();
        let key = (email.to_string(), user_type);

        let matches = inner.login_otps.get(&key).is_some_and(|otp| {
            !otp.is_expired(now)
                && constant_time_eq(&otp.otp_hash, otp_hash)
                && device_id.map_or(true, |d| otp.device_id.as_deref() == Some(d))
        });

        if matches {
            inner.login_otps.remove(&key);
        }
        Ok(matches)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner();
        let before = inner.pending.len() + inner.login_otps.len();
        inner.pending.retain(|_, p| !p.is_expired(now));
        inner.login_otps.retain(|_, o| !o.is_expired(now));
        let after = inner.pending.len() + inner.login_otps.len();
        Ok((before - after) as u64)
    }
}

#[async_trait]
impl StudentStore for InMemoryStore {
    async fn find_student_by_id(&self, id: Uuid) -> StoreResult<Option<Student>> {
        Ok(self.inner().students.get(&id).cloned())
    }

    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>> {
        Ok(self
            .inner()
            .students
            .values()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn find_student_by_device(&self, device_id: &str) -> StoreResult<Option<Student>> {
        Ok(self
            .inner()
            .students
            .values()
            .find(|s| s.is_verified && s.device_id == device_id)
            .cloned())
    }

    async fn identity_taken(&self, email: &str, enrollment_number: &str) -> StoreResult<bool> {
        Ok(self.inner().students.values().any(|s| {
            s.is_verified && (s.email == email || s.enrollment_number == enrollment_number)
        }))
    }

    async fn record_student_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(s) = self.inner().students.get_mut(&id) {
            s.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl TeacherStore for InMemoryStore {
    async fn find_teacher_by_id(&self, id: Uuid) -> StoreResult<Option<Teacher>> {
        Ok(self.inner().teachers.get(&id).cloned())
    }

    async fn find_active_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>> {
        Ok(self
            .inner()
            .teachers
            .values()
            .find(|t| t.email == email && t.is_active)
            .cloned())
    }

    async fn record_teacher_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(t) = self.inner().teachers.get_mut(&id) {
            t.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl SubjectStore for InMemoryStore {
    async fn list_subjects_for_teacher(&self, teacher_id: Uuid) -> StoreResult<Vec<Subject>> {
        let inner = self.inner();
        let mut subjects: Vec<Subject> = inner
            .assignments
            .iter()
            .filter(|(t, _)| *t == teacher_id)
            .filter_map(|(_, s)| inner.subjects.get(s).cloned())
            .collect();
        subjects.sort_by(|a, b| a.subject_name.cmp(&b.subject_name));
        Ok(subjects)
    }

    async fn find_assigned_subject(
        &self,
        teacher_id: Uuid,
        subject_id: Uuid,
    ) -> StoreResult<Option<Subject>> {
        let inner = self.inner();
        if !inner.assignments.contains(&(teacher_id, subject_id)) {
            return Ok(None);
        }
        Ok(inner.subjects.get(&subject_id).cloned())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_superseding(&self, new: NewSession) -> StoreResult<AttendanceSession> {
        let mut inner = self.inner();

        for s in inner
            .sessions
            .iter_mut()
            .filter(|s| s.teacher_id == new.teacher_id && s.subject_id == new.subject_id)
        {
            s.is_active = false;
        }

        let session = AttendanceSession {
            id: Uuid::new_v4(),
            session_id: new.session_id,
            teacher_id: new.teacher_id,
            subject_id: new.subject_id,
            latitude: new.latitude,
            longitude: new.longitude,
            created_at: new.created_at,
            expires_at: new.expires_at,
            is_active: true,
        };
        inner.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<AttendanceSession>> {
        Ok(self.session_snapshot(session_id))
    }

    async fn list_active_sessions(
        &self,
        teacher_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<ActiveSessionSummary>> {
        let inner = self.inner();
        let mut summaries: Vec<ActiveSessionSummary> = inner
            .sessions
            .iter()
            .filter(|s| s.teacher_id == teacher_id && s.is_open(now))
            .filter_map(|s| {
                let subject = inner.subjects.get(&s.subject_id)?;
                let student_count = inner
                    .attendance
                    .iter()
                    .filter(|a| a.session_id == s.id)
                    .count() as i64;
                Some(ActiveSessionSummary {
                    id: s.id,
                    session_id: s.session_id.clone(),
                    subject_id: s.subject_id,
                    subject_name: subject.subject_name.clone(),
                    subject_code: subject.subject_code.clone(),
                    created_at: s.created_at,
                    expires_at: s.expires_at,
                    student_count,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn count_sessions(&self, teacher_id: Uuid, subject_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .inner()
            .sessions
            .iter()
            .filter(|s| s.teacher_id == teacher_id && s.subject_id == subject_id)
            .count() as i64)
    }
}

#[async_trait]
impl AttendanceStore for InMemoryStore {
    async fn insert_attendance(
        &self,
        record: NewAttendanceRecord,
    ) -> StoreResult<AttendanceRecord> {
        let mut inner = self.inner();

        if inner
            .attendance
            .iter()
            .any(|a| a.student_id == record.student_id && a.session_id == record.session_id)
        {
            return Err(StoreError::UniqueViolation(
                ATTENDANCE_STUDENT_SESSION_KEY.to_string(),
            ));
        }

        let stored = AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: record.student_id,
            teacher_id: record.teacher_id,
            subject_id: record.subject_id,
            session_id: record.session_id,
            student_latitude: record.student_latitude,
            student_longitude: record.student_longitude,
            distance_meters: record.distance_meters,
            is_valid: true,
            marked_at: record.marked_at,
        };
        inner.attendance.push(stored.clone());
        Ok(stored)
    }

    async fn attendance_exists(&self, student_id: Uuid, session_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .inner()
            .attendance
            .iter()
            .any(|a| a.student_id == student_id && a.session_id == session_id))
    }

    async fn report_entries(
        &self,
        teacher_id: Uuid,
        subject_id: Uuid,
    ) -> StoreResult<Vec<ReportEntry>> {
        let inner = self.inner();
        let mut entries: Vec<ReportEntry> = inner
            .attendance
            .iter()
            .filter(|a| a.teacher_id == teacher_id && a.subject_id == subject_id && a.is_valid)
            .filter_map(|a| {
                let student = inner.students.get(&a.student_id)?;
                let subject = inner.subjects.get(&a.subject_id)?;
                Some(ReportEntry {
                    id: a.id,
                    student_id: student.id,
                    full_name: student.full_name.clone(),
                    enrollment_number: student.enrollment_number.clone(),
                    email: student.email.clone(),
                    marked_at: a.marked_at,
                    distance_from_teacher: a.distance_meters,
                    subject_name: subject.subject_name.clone(),
                    subject_code: subject.subject_code.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.marked_at.cmp(&a.marked_at));
        Ok(entries)
    }

    async fn student_entries(&self, student_id: Uuid) -> StoreResult<Vec<StudentAttendanceEntry>> {
        let inner = self.inner();
        let mut entries: Vec<StudentAttendanceEntry> = inner
            .attendance
            .iter()
            .filter(|a| a.student_id == student_id && a.is_valid)
            .filter_map(|a| {
                let subject = inner.subjects.get(&a.subject_id)?;
                let teacher = inner.teachers.get(&a.teacher_id)?;
                Some(StudentAttendanceEntry {
                    id: a.id,
                    subject_name: subject.subject_name.clone(),
                    subject_code: subject.subject_code.clone(),
                    teacher_name: teacher.full_name.clone(),
                    marked_at: a.marked_at,
                    distance_from_teacher: a.distance_meters,
                    attendance_date: a.marked_at.date_naive(),
                })
            })
            .collect();
        entries.sort_by(|a, b| b.marked_at.cmp(&a.marked_at));
        Ok(entries)
    }
}

#[async_trait]
impl DeviceChangeStore for InMemoryStore {
    async fn create_device_change(
        &self,
        request: NewDeviceChangeRequest,
    ) -> StoreResult<DeviceChangeRequest> {
        let mut inner = self.inner();

        if inner
            .device_changes
            .iter()
            .any(|r| r.student_id == request.student_id && r.status == DeviceChangeStatus::Pending)
        {
            return Err(StoreError::UniqueViolation(
                DEVICE_CHANGE_PENDING_KEY.to_string(),
            ));
        }

        let stored = DeviceChangeRequest {
            id: Uuid::new_v4(),
            student_id: request.student_id,
            current_device_id: request.current_device_id,
            new_device_id: request.new_device_id,
            reason: request.reason,
            status: DeviceChangeStatus::Pending,
            reviewed_by: None,
            review_note: None,
            created_at: request.created_at,
            reviewed_at: None,
        };
        inner.device_changes.push(stored.clone());
        Ok(stored)
    }

    async fn find_device_change(&self, id: Uuid) -> StoreResult<Option<DeviceChangeRequest>> {
        Ok(self
            .inner()
            .device_changes
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn find_pending_device_change(
        &self,
        student_id: Uuid,
    ) -> StoreResult<Option<DeviceChangeRequest>> {
        Ok(self
            .inner()
            .device_changes
            .iter()
            .find(|r| r.student_id == student_id && r.status == DeviceChangeStatus::Pending)
            .cloned())
    }

    async fn list_pending_device_changes(&self) -> StoreResult<Vec<DeviceChangeRequest>> {
        let mut pending: Vec<DeviceChangeRequest> = self
            .inner()
            .device_changes
            .iter()
            .filter(|r| r.status == DeviceChangeStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    async fn approve_device_change(
        &self,
        id: Uuid,
        review: DeviceChangeReview,
    ) -> StoreResult<Option<DeviceChangeRequest>> {
        let mut inner = self.inner();

        let Some(index) = inner
            .device_changes
            .iter()
            .position(|r| r.id == id && r.status == DeviceChangeStatus::Pending)
        else {
            return Ok(None);
        };

        let (student_id, new_device_id) = {
            let r = &inner.device_changes[index];
            (r.student_id, r.new_device_id.clone())
        };

        if inner
            .students
            .values()
            .any(|s| s.id != student_id && s.device_id == new_device_id)
        {
            return Err(StoreError::UniqueViolation(STUDENTS_DEVICE_KEY.to_string()));
        }

        match inner.students.get_mut(&student_id) {
            Some(student) => student.device_id = new_device_id,
            None => return Err(StoreError::Other("student no longer exists".to_string())),
        }

        let request = &mut inner.device_changes[index];
        request.status = DeviceChangeStatus::Approved;
        request.reviewed_by = review.reviewed_by;
        request.review_note = review.note;
        request.reviewed_at = Some(review.reviewed_at);
        Ok(Some(request.clone()))
    }

    async fn reject_device_change(
        &self,
        id: Uuid,
        review: DeviceChangeReview,
    ) -> StoreResult<Option<DeviceChangeRequest>> {
        let mut inner = self.inner();

        let Some(request) = inner
            .device_changes
            .iter_mut()
            .find(|r| r.id == id && r.status == DeviceChangeStatus::Pending)
        else {
            return Ok(None);
        };

        request.status = DeviceChangeStatus::Rejected;
        request.reviewed_by = review.reviewed_by;
        request.review_note = review.note;
        request.reviewed_at = Some(review.reviewed_at);
        Ok(Some(request.clone()))
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending(email: &str, device: &str, hash: &str, expires_at: DateTime<Utc>) -> PendingRegistration {
        PendingRegistration {
            email: email.into(),
            full_name: "Asha".into(),
            enrollment_number: format!("EN-{}", email),
            branch: "CSE".into(),
            year: 1,
            device_id: device.into(),
            otp_hash: hash.into(),
            otp_expires_at: expires_at,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_promotion_conflict_keeps_pending_row() {
        let store = InMemoryStore::new();
        store.add_student("Ravi", "ravi@example.edu", "CS002", "dev-1");
        let expires = Utc::now() + Duration::minutes(10);
        store
            .upsert_pending_registration(pending("asha@example.edu", "dev-1", "h", expires))
            .await
            .unwrap();

        let result = store
            .promote_registration("asha@example.edu", "h", Utc::now())
            .await;
        match result {
            Err(StoreError::UniqueViolation(c)) => assert_eq!(c, STUDENTS_DEVICE_KEY),
            other => panic!("expected UniqueViolation, got {:?}", other),
        }
        assert!(store
            .find_pending_registration("asha@example.edu")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_pending_registration_upsert_overwrites() {
        let store = InMemoryStore::new();
        let expires = Utc::now() + Duration::minutes(10);
        store
            .upsert_pending_registration(pending("asha@example.edu", "dev-1", "first", expires))
            .await
            .unwrap();
        store
            .upsert_pending_registration(pending("asha@example.edu", "dev-2", "second", expires))
            .await
            .unwrap();

        let stored = store
            .find_pending_registration("asha@example.edu")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.otp_hash, "second");
        assert_eq!(stored.device_id, "dev-2");
    }

    #[tokio::test]
    async fn test_duplicate_attendance_insert_rejected() {
        let store = InMemoryStore::new();
        let record = NewAttendanceRecord {
            student_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            student_latitude: 0.0,
            student_longitude: 0.0,
            distance_meters: 1.0,
            marked_at: Utc::now(),
        };
        store.insert_attendance(record.clone()).await.unwrap();
        assert!(matches!(
            store.insert_attendance(record).await,
            Err(StoreError::UniqueViolation(_))
        ));
        assert_eq!(store.attendance_count(), 1);
    }
}
