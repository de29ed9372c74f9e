//! One-time passcode issuance and verification.
//!
//! Codes are six digits, valid for a fixed window and single-use. Issuing a
//! new code for the same key overwrites the previous one. Every verification
//! failure collapses into [`DomainError::InvalidOtp`].

use chrono::{Duration, Utc};
use shared::crypto::{generate_otp, sha256_hex};
use shared::jwt::Role;
use shared::validation::validate_otp;
use std::sync::Arc;

use crate::error::{DomainError, MSG_DUPLICATE_DEVICE, MSG_DUPLICATE_IDENTITY};
use crate::models::{LoginOtp, OtpIssued, OtpPurpose, PendingRegistration, RegisterStudentRequest, Student};
use crate::services::notification::{NotificationResult, OtpMessage, OtpNotifier};
use crate::store::{CredentialStore, StoreError};

/// Passcode lifetime and delivery bounds.
#[derive(Debug, Clone, Copy)]
pub struct OtpSettings {
    pub validity: Duration,
    pub dispatch_timeout: std::time::Duration,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            validity: Duration::minutes(10),
            dispatch_timeout: std::time::Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn OtpNotifier>,
    settings: OtpSettings,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn OtpNotifier>,
        settings: OtpSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    /// Stores the registration and dispatches its confirmation code.
    pub async fn issue_registration(
        &self,
        request: &RegisterStudentRequest,
    ) -> Result<OtpIssued, DomainError> {
        let code = generate_otp();
        let now = Utc::now();
        let expires_at = now + self.settings.validity;

        self.store
            .upsert_pending_registration(PendingRegistration {
                email: request.email.clone(),
                full_name: request.full_name.trim().to_string(),
                enrollment_number: request.enrollment_number.clone(),
                branch: request.branch.trim().to_string(),
                year: request.year,
                device_id: request.device_id.clone(),
                otp_hash: sha256_hex(&code),
                otp_expires_at: expires_at,
                created_at: now,
            })
            .await?;

        self.dispatch(&request.email, code, OtpPurpose::Registration, Role::Student)
            .await?;

        Ok(OtpIssued {
            email: request.email.clone(),
            expires_at,
        })
    }

    /// Stores a login code for (email, user type) and dispatches it.
    ///
    /// Student codes are bound to the device they were requested from.
    pub async fn issue_login(
        &self,
        email: &str,
        user_type: Role,
        device_id: Option<&str>,
    ) -> Result<OtpIssued, DomainError> {
        let code = generate_otp();
        let now = Utc::now();
        let expires_at = now + self.settings.validity;

        self.store
            .upsert_login_otp(LoginOtp {
                email: email.to_string(),
                user_type,
                otp_hash: sha256_hex(&code),
                expires_at,
                device_id: device_id.map(str::to_string),
                created_at: now,
            })
            .await?;

        self.dispatch(email, code, OtpPurpose::Login, user_type)
            .await?;

        Ok(OtpIssued {
            email: email.to_string(),
            expires_at,
        })
    }

    /// Verifies a registration code and promotes the pending registration.
    pub async fn redeem_registration(&self, email: &str, code: &str) -> Result<Student, DomainError> {
        if validate_otp(code).is_err() {
            return Err(DomainError::InvalidOtp);
        }

        match self
            .store
            .promote_registration(email, &sha256_hex(code), Utc::now())
            .await
        {
            Ok(Some(student)) => Ok(student),
            Ok(None) => Err(DomainError::InvalidOtp),
            Err(StoreError::UniqueViolation(constraint)) => {
                tracing::warn!(
                    email = %email,
                    constraint = %constraint,
                    "Registration clashed with an existing account"
                );
                if constraint.contains("device") {
                    Err(DomainError::Duplicate(MSG_DUPLICATE_DEVICE.to_string()))
                } else {
                    Err(DomainError::Duplicate(MSG_DUPLICATE_IDENTITY.to_string()))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verifies and consumes a login code.
    pub async fn verify_login(
        &self,
        email: &str,
        code: &str,
        user_type: Role,
        device_id: Option<&str>,
    ) -> Result<(), DomainError> {
        if validate_otp(code).is_err() {
            return Err(DomainError::InvalidOtp);
        }

        let consumed = self
            .store
            .consume_login_otp(email, user_type, &sha256_hex(code), device_id, Utc::now())
            .await?;

        if consumed {
            Ok(())
        } else {
            Err(DomainError::InvalidOtp)
        }
    }

    /// Deletes expired passcode records.
    pub async fn purge_expired(&self) -> Result<u64, DomainError> {
        Ok(self.store.purge_expired(Utc::now()).await?)
    }

    async fn dispatch(
        &self,
        email: &str,
        code: String,
        purpose: OtpPurpose,
        recipient_type: Role,
    ) -> Result<(), DomainError> {
        let message = OtpMessage {
            email: email.to_string(),
            code,
            purpose,
            recipient_type,
            valid_for_minutes: self.settings.validity.num_minutes(),
        };

        let outcome =
            tokio::time::timeout(self.settings.dispatch_timeout, self.notifier.send_otp(&message))
                .await;

        match outcome {
            Ok(NotificationResult::Sent) => {
                tracing::info!(email = %email, purpose = %purpose, "OTP dispatched");
                Ok(())
            }
            Ok(NotificationResult::Failed(reason)) => {
                tracing::error!(email = %email, purpose = %purpose, reason = %reason, "OTP dispatch failed");
                Err(DomainError::Dependency(
                    "Failed to send OTP email. Please try again later.".to_string(),
                ))
            }
            Err(_) => {
                tracing::error!(
                    email = %email,
                    purpose = %purpose,
                    timeout_secs = self.settings.dispatch_timeout.as_secs(),
                    "OTP dispatch timed out"
                );
                Err(DomainError::Dependency(
                    "Timed out sending OTP email. Please try again later.".to_string(),
                ))
            }
        }
    }
}
