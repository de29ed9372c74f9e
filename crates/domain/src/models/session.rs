//! QR attendance session models.
//!
//! A session is opened by a teacher for one subject, anchored at the teacher's
//! coordinates, and stays usable until it expires or a newer session for the
//! same (teacher, subject) pair supersedes it.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::crypto::SESSION_ID_PREFIX;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::subject::Subject;

/// Lifecycle state of a session at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Expired,
    Superseded,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Expired => write!(f, "expired"),
            SessionState::Superseded => write!(f, "superseded"),
        }
    }
}

/// Stored attendance session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: Uuid,
    /// Opaque public identifier carried in the QR payload.
    pub session_id: String,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl AttendanceSession {
    /// Expiry is enforced lazily: the stored flag is ignored once `expires_at` has passed.
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if !self.is_active {
            SessionState::Superseded
        } else if self.expires_at <= now {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == SessionState::Active
    }
}

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: String,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Error decoding a QR payload.
#[derive(Debug, Error)]
pub enum QrPayloadError {
    #[error("QR payload is not valid base64")]
    Encoding,

    #[error("QR payload is not valid JSON: {0}")]
    Json(String),
}

/// Content encoded into the QR code displayed by the teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub session_id: String,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub expires_at: DateTime<Utc>,
}

impl QrPayload {
    pub fn from_session(session: &AttendanceSession) -> Self {
        Self {
            session_id: session.session_id.clone(),
            teacher_id: session.teacher_id,
            subject_id: session.subject_id,
            latitude: session.latitude,
            longitude: session.longitude,
            expires_at: session.expires_at,
        }
    }

    /// Encodes the payload as base64 of its JSON form.
    pub fn encode(&self) -> Result<String, QrPayloadError> {
        let json = serde_json::to_vec(self).map_err(|e| QrPayloadError::Json(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self, QrPayloadError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| QrPayloadError::Encoding)?;
        serde_json::from_slice(&bytes).map_err(|e| QrPayloadError::Json(e.to_string()))
    }
}

/// Resolves what a scanning client submitted into a session identifier.
///
/// Clients may send either the bare session id or the full encoded QR payload.
pub fn session_reference(scanned: &str) -> Option<String> {
    let scanned = scanned.trim();
    if scanned.starts_with(SESSION_ID_PREFIX) {
        return Some(scanned.to_string());
    }
    QrPayload::decode(scanned).ok().map(|p| p.session_id)
}

/// Request payload for generating a QR session.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrRequest {
    pub subject_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
}

/// A freshly created session with its encoded QR content.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session: AttendanceSession,
    pub subject: Subject,
    pub qr_code: String,
}

/// Response for QR generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrResponse {
    pub message: String,
    pub qr_code: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    pub subject: Subject,
}

impl From<CreatedSession> for GenerateQrResponse {
    fn from(created: CreatedSession) -> Self {
        Self {
            message: "QR code generated successfully".to_string(),
            qr_code: created.qr_code,
            session_id: created.session.session_id,
            expires_at: created.session.expires_at,
            subject: created.subject,
        }
    }
}

/// A live session with its attendance count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActiveSessionSummary {
    pub id: Uuid,
    pub session_id: String,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub student_count: i64,
}

/// Response for listing active sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionsResponse {
    pub sessions: Vec<ActiveSessionSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(is_active: bool, expires_in: Duration) -> AttendanceSession {
        let now = Utc::now();
        AttendanceSession {
            id: Uuid::new_v4(),
            session_id: shared::crypto::generate_session_id(),
            teacher_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            latitude: 12.9716,
            longitude: 77.5946,
            created_at: now,
            expires_at: now + expires_in,
            is_active,
        }
    }

    #[test]
    fn test_session_state_active() {
        let s = session(true, Duration::minutes(10));
        assert_eq!(s.state(Utc::now()), SessionState::Active);
        assert!(s.is_open(Utc::now()));
    }

    #[test]
    fn test_session_state_expired_despite_active_flag() {
        let s = session(true, Duration::minutes(10));
        let later = s.expires_at + Duration::seconds(1);
        assert_eq!(s.state(later), SessionState::Expired);
    }

    #[test]
    fn test_session_state_expired_at_exact_boundary() {
        let s = session(true, Duration::minutes(10));
        assert_eq!(s.state(s.expires_at), SessionState::Expired);
    }

    #[test]
    fn test_session_state_superseded() {
        let s = session(false, Duration::minutes(10));
        assert_eq!(s.state(Utc::now()), SessionState::Superseded);
        assert!(!s.is_open(Utc::now()));
    }

    #[test]
    fn test_qr_payload_decodes_to_same_fields() {
        let s = session(true, Duration::minutes(10));
        let payload = QrPayload::from_session(&s);
        let encoded = payload.encode().unwrap();

        let decoded = QrPayload::decode(&encoded).unwrap();
        assert_eq!(decoded, payload);

        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(&encoded).unwrap()).unwrap();
        assert_eq!(json["sessionId"], s.session_id.as_str());
        assert!(json.get("expiresAt").is_some());
    }

    #[test]
    fn test_qr_payload_decode_garbage() {
        assert!(matches!(
            QrPayload::decode("%%%not base64%%%"),
            Err(QrPayloadError::Encoding)
        ));
        let not_json = STANDARD.encode("hello");
        assert!(matches!(
            QrPayload::decode(&not_json),
            Err(QrPayloadError::Json(_))
        ));
    }

    #[test]
    fn test_session_reference_accepts_id_or_payload() {
        let s = session(true, Duration::minutes(10));
        assert_eq!(
            session_reference(&s.session_id).as_deref(),
            Some(s.session_id.as_str())
        );

        let encoded = QrPayload::from_session(&s).encode().unwrap();
        assert_eq!(
            session_reference(&encoded).as_deref(),
            Some(s.session_id.as_str())
        );

        assert!(session_reference("garbage").is_none());
    }
}
