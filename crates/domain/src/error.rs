//! Domain error taxonomy.

use thiserror::Error;

use crate::store::StoreError;

pub const MSG_DUPLICATE_IDENTITY: &str =
    "Student with this email or enrollment number already exists";
pub const MSG_DUPLICATE_DEVICE: &str = "This device is already registered with another account";
pub const MSG_INVALID_OTP: &str = "Invalid or expired OTP";
pub const MSG_STUDENT_NOT_FOUND: &str = "Student not found. Please register first.";
pub const MSG_DEVICE_MISMATCH: &str =
    "This account is registered to a different device. Please request a device change.";
pub const MSG_TEACHER_NOT_FOUND: &str = "Teacher not found or account is inactive";
pub const MSG_NOT_ASSIGNED_SESSION: &str =
    "You are not authorized to take attendance for this subject";
pub const MSG_NOT_ASSIGNED_REPORT: &str = "You are not authorized to view this subject";
pub const MSG_INVALID_SESSION: &str = "Invalid or expired QR session";
pub const MSG_ALREADY_MARKED: &str = "Attendance already marked for this session";

/// Failures surfaced by domain services.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Conflicting unique identity (email, enrollment number or device).
    #[error("{0}")]
    Duplicate(String),

    /// Passcode wrong, expired, already used or never issued.
    #[error("Invalid or expired OTP")]
    InvalidOtp,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Account exists but is bound to another device.
    #[error("{}", MSG_DEVICE_MISMATCH)]
    DeviceMismatch,

    /// Session unknown, superseded or expired.
    #[error("Invalid or expired QR session")]
    InvalidSession,

    #[error("You are too far from the teacher. Distance: {distance_meters:.1}m (Max: {max_meters}m)")]
    TooFar {
        distance_meters: f64,
        max_meters: f64,
    },

    #[error("Attendance already marked for this session")]
    AlreadyMarked,

    #[error("{0}")]
    Conflict(String),

    /// Notification collaborator or store unreachable.
    #[error("{0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(what) => {
                DomainError::Conflict(format!("Resource already exists: {}", what))
            }
            StoreError::Unavailable(msg) => {
                DomainError::Dependency(format!("Store unavailable: {}", msg))
            }
            StoreError::Other(msg) => DomainError::Internal(msg),
        }
    }
}
