//! Passcode delivery.
//!
//! Provides the abstraction the credential flow uses to hand a passcode to
//! the account holder. Delivery mechanics live in the API crate.

use serde::{Deserialize, Serialize};
use shared::jwt::Role;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::models::OtpPurpose;

/// A passcode addressed to one account holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpMessage {
    pub email: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub recipient_type: Role,
    pub valid_for_minutes: i64,
}

impl OtpMessage {
    pub fn subject(&self) -> String {
        match self.purpose {
            OtpPurpose::Registration => "Confirm your attendance account".to_string(),
            OtpPurpose::Login => "Your attendance login code".to_string(),
        }
    }

    pub fn body(&self) -> String {
        let audience = match self.recipient_type {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
        };
        format!(
            "Hello {},\n\nYour one-time code is {}.\nIt expires in {} minutes and can be used once.\n\nIf you did not request this code, ignore this message.",
            audience, self.code, self.valid_for_minutes
        )
    }
}

/// Result of a dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    /// Message was handed to the provider.
    Sent,
    /// Dispatch failed with the given reason.
    Failed(String),
}

/// Delivers passcodes to account holders.
#[async_trait::async_trait]
pub trait OtpNotifier: Send + Sync {
    async fn send_otp(&self, message: &OtpMessage) -> NotificationResult;
}

/// Mock notifier for development and testing.
///
/// Records every message so tests can read back the issued code.
#[derive(Debug, Default)]
pub struct MockOtpNotifier {
    simulate_failure: AtomicBool,
    sent: Mutex<Vec<OtpMessage>>,
}

impl MockOtpNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock notifier that simulates failures.
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.simulate_failure.store(failing, Ordering::SeqCst);
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<OtpMessage> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// The most recent code sent to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.email == email)
            .map(|m| m.code)
    }
}

#[async_trait::async_trait]
impl OtpNotifier for MockOtpNotifier {
    async fn send_otp(&self, message: &OtpMessage) -> NotificationResult {
        if self.simulate_failure.load(Ordering::SeqCst) {
            tracing::warn!(
                email = %message.email,
                purpose = %message.purpose,
                "Mock notifier simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            email = %message.email,
            purpose = %message.purpose,
            recipient_type = %message.recipient_type,
            "Mock: Would send OTP message"
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        NotificationResult::Sent
    }
}
