//! One-time passcode records.
//!
//! Only SHA-256 digests of codes are ever stored. A pending registration is
//! keyed by email; a login passcode by (email, user type).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::jwt::Role;

/// What a passcode was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    Registration,
    Login,
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpPurpose::Registration => write!(f, "registration"),
            OtpPurpose::Login => write!(f, "login"),
        }
    }
}

/// Registration waiting for email confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRegistration {
    pub email: String,
    pub full_name: String,
    pub enrollment_number: String,
    pub branch: String,
    pub year: i32,
    pub device_id: String,
    pub otp_hash: String,
    pub otp_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PendingRegistration {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.otp_expires_at <= now
    }
}

/// Login passcode. Students carry the device the code was requested from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOtp {
    pub email: String,
    pub user_type: Role,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LoginOtp {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Outcome of a successful issuance.
#[derive(Debug, Clone, PartialEq)]
pub struct OtpIssued {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}
