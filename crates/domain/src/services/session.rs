//! QR attendance session lifecycle.

use chrono::{DateTime, Duration, Utc};
use shared::crypto::generate_session_id;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DomainError, MSG_NOT_ASSIGNED_SESSION};
use crate::models::{
    session_reference, ActiveSessionSummary, AttendanceSession, CreatedSession, NewSession,
    QrPayload, Subject,
};
use crate::store::{SessionStore, Stores, SubjectStore};

/// Default lifetime of a QR session.
pub const DEFAULT_SESSION_VALIDITY_SECS: i64 = 600;

#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    subjects: Arc<dyn SubjectStore>,
    validity: Duration,
}

impl SessionService {
    pub fn new(stores: &Stores, validity: Duration) -> Self {
        Self {
            sessions: stores.sessions.clone(),
            subjects: stores.subjects.clone(),
            validity,
        }
    }

    /// Subjects the teacher is assigned to.
    pub async fn list_subjects(&self, teacher_id: Uuid) -> Result<Vec<Subject>, DomainError> {
        Ok(self.subjects.list_subjects_for_teacher(teacher_id).await?)
    }

    /// Opens a new session for (teacher, subject), superseding any active one.
    ///
    /// Concurrent calls for the same pair both succeed; the last commit stays active.
    pub async fn create_session(
        &self,
        teacher_id: Uuid,
        subject_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<CreatedSession, DomainError> {
        let subject = self
            .subjects
            .find_assigned_subject(teacher_id, subject_id)
            .await?
            .ok_or_else(|| DomainError::Forbidden(MSG_NOT_ASSIGNED_SESSION.to_string()))?;

        let now = Utc::now();
        let session = self
            .sessions
            .create_superseding(NewSession {
                session_id: generate_session_id(),
                teacher_id,
                subject_id,
                latitude,
                longitude,
                created_at: now,
                expires_at: now + self.validity,
            })
            .await?;

        let qr_code = QrPayload::from_session(&session)
            .encode()
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        tracing::info!(
            teacher_id = %teacher_id,
            subject_id = %subject_id,
            session_id = %session.session_id,
            expires_at = %session.expires_at,
            "QR session created"
        );

        Ok(CreatedSession {
            session,
            subject,
            qr_code,
        })
    }

    /// The teacher's active, unexpired sessions with live attendance counts.
    pub async fn list_active_sessions(
        &self,
        teacher_id: Uuid,
    ) -> Result<Vec<ActiveSessionSummary>, DomainError> {
        Ok(self
            .sessions
            .list_active_sessions(teacher_id, Utc::now())
            .await?)
    }

    /// Resolves a scanned reference to a session that is open at `now`.
    pub async fn resolve_open_session(
        &self,
        scanned: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceSession, DomainError> {
        let session_id = session_reference(scanned).ok_or(DomainError::InvalidSession)?;
        self.sessions
            .find_session(&session_id)
            .await?
            .filter(|s| s.is_open(now))
            .ok_or(DomainError::InvalidSession)
    }
}
