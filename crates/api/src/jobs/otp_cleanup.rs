//! Removes expired pending registrations and login passcodes, and drops
//! rate limiter keys whose quota has replenished.

use std::sync::Arc;

use domain::services::CredentialService;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::RateLimiterState;

pub struct OtpCleanupJob {
    credentials: CredentialService,
    rate_limiter: Option<Arc<RateLimiterState>>,
    interval_secs: u64,
}

impl OtpCleanupJob {
    pub fn new(credentials: CredentialService, interval_secs: u64) -> Self {
        Self {
            credentials,
            rate_limiter: None,
            interval_secs,
        }
    }

    /// Also evict stale keys from the passcode rate limiter on each run.
    pub fn with_rate_limiter(mut self, rate_limiter: Option<Arc<RateLimiterState>>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }
}

#[async_trait::async_trait]
impl Job for OtpCleanupJob {
    fn name(&self) -> &'static str {
        "otp_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let removed = self
            .credentials
            .purge_expired()
            .await
            .map_err(|e| e.to_string())?;
        if removed > 0 {
            tracing::info!(removed, "Purged expired passcodes");
        }

        if let Some(limiter) = &self.rate_limiter {
            let tracked = limiter.retain_recent();
            tracing::debug!(tracked, "Evicted replenished rate limiter keys");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::memory::InMemoryStore;
    use domain::models::RegisterStudentRequest;
    use domain::services::{MockOtpNotifier, OtpSettings};

    #[tokio::test]
    async fn test_purges_expired_registration() {
        let store = Arc::new(InMemoryStore::new());
        let stores = store.clone().stores();
        let credentials = CredentialService::new(
            stores.credentials.clone(),
            Arc::new(MockOtpNotifier::new()),
            OtpSettings {
                validity: chrono::Duration::seconds(-1),
                ..OtpSettings::default()
            },
        );

        credentials
            .issue_registration(&RegisterStudentRequest {
                full_name: "Asha Rao".into(),
                email: "asha@example.edu".into(),
                enrollment_number: "CS2024001".into(),
                branch: "CSE".into(),
                year: 2,
                device_id: "device-1".into(),
            })
            .await
            .unwrap();

        let job = OtpCleanupJob::new(credentials.clone(), 60);
        assert_eq!(job.frequency(), JobFrequency::Seconds(60));
        job.execute().await.unwrap();
        assert_eq!(credentials.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keeps_active_rate_limiter_keys() {
        let store = Arc::new(InMemoryStore::new());
        let stores = store.clone().stores();
        let credentials = CredentialService::new(
            stores.credentials.clone(),
            Arc::new(MockOtpNotifier::new()),
            OtpSettings::default(),
        );
        let limiter = Arc::new(RateLimiterState::per_hour(1).unwrap());
        limiter.check("asha@example.edu").unwrap();

        let job = OtpCleanupJob::new(credentials, 60).with_rate_limiter(Some(limiter.clone()));
        job.execute().await.unwrap();

        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.check("asha@example.edu").is_err());
    }
}
