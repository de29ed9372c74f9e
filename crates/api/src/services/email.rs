//! Passcode delivery by email.
//!
//! Supported providers:
//! - `console`: logs the message (development only, prints the code)
//! - `sendgrid`: SendGrid v3 mail API

use async_trait::async_trait;
use domain::services::{NotificationResult, OtpMessage, OtpNotifier};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::EmailConfig;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    Console,
    SendGrid,
}

/// Dispatches passcodes with the configured provider.
#[derive(Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
    provider: Provider,
    client: reqwest::Client,
}

impl EmailNotifier {
    /// With email disabled every message goes to the console provider.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let provider = match (config.enabled, config.provider.as_str()) {
            (false, _) | (true, "console") => Provider::Console,
            (true, "sendgrid") if config.sendgrid_api_key.is_empty() => {
                return Err(EmailError::NotConfigured(
                    "sendgrid_api_key is empty".to_string(),
                ))
            }
            (true, "sendgrid") => Provider::SendGrid,
            (true, other) => {
                return Err(EmailError::NotConfigured(format!(
                    "unknown provider '{}'",
                    other
                )))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmailError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            provider,
            client,
        })
    }

    pub fn provider_name(&self) -> &'static str {
        match self.provider {
            Provider::Console => "console",
            Provider::SendGrid => "sendgrid",
        }
    }

    fn send_console(&self, message: &OtpMessage) {
        warn!(
            to = %message.email,
            purpose = %message.purpose,
            "Email delivery disabled; passcode written to the log"
        );
        info!(
            to = %message.email,
            subject = %message.subject(),
            from = %self.config.sender_email,
            body = %message.body(),
            "Email (console provider)"
        );
    }

    async fn send_sendgrid(&self, message: &OtpMessage) -> Result<(), EmailError> {
        let body = serde_json::json!({
            "personalizations": [{
                "to": [{ "email": message.email }]
            }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject(),
            "content": [{
                "type": "text/plain",
                "value": message.body()
            }]
        });

        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(to = %message.email, purpose = %message.purpose, "Passcode sent via SendGrid");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}",
                status
            )))
        }
    }
}

#[async_trait]
impl OtpNotifier for EmailNotifier {
    async fn send_otp(&self, message: &OtpMessage) -> NotificationResult {
        match self.provider {
            Provider::Console => {
                self.send_console(message);
                NotificationResult::Sent
            }
            Provider::SendGrid => match self.send_sendgrid(message).await {
                Ok(()) => NotificationResult::Sent,
                Err(e) => NotificationResult::Failed(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::OtpPurpose;
    use shared::jwt::Role;

    fn message() -> OtpMessage {
        OtpMessage {
            email: "asha@example.edu".into(),
            code: "123456".into(),
            purpose: OtpPurpose::Login,
            recipient_type: Role::Student,
            valid_for_minutes: 10,
        }
    }

    #[test]
    fn test_disabled_uses_console() {
        let notifier = EmailNotifier::new(EmailConfig {
            provider: "sendgrid".into(),
            ..EmailConfig::default()
        })
        .unwrap();
        assert_eq!(notifier.provider_name(), "console");
    }

    #[test]
    fn test_sendgrid_requires_key() {
        let result = EmailNotifier::new(EmailConfig {
            enabled: true,
            provider: "sendgrid".into(),
            ..EmailConfig::default()
        });
        assert!(matches!(result, Err(EmailError::NotConfigured(_))));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let result = EmailNotifier::new(EmailConfig {
            enabled: true,
            provider: "pigeon".into(),
            ..EmailConfig::default()
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_console_reports_sent() {
        let notifier = EmailNotifier::new(EmailConfig::default()).unwrap();
        assert_eq!(notifier.send_otp(&message()).await, NotificationResult::Sent);
    }
}
