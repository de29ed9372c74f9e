//! HTTP route handlers.

pub mod admin;
pub mod health;
pub mod student;
pub mod teacher;

use crate::app::AppState;
use crate::error::ApiError;

/// Consumes one passcode issuance for `email` if limiting is enabled.
pub(crate) fn check_otp_rate(state: &AppState, email: &str) -> Result<(), ApiError> {
    let Some(limiter) = state.otp_limiter.as_deref() else {
        return Ok(());
    };

    limiter.check(email).map_err(|retry_after_secs| {
        tracing::warn!(
            limit_per_hour = limiter.limit_per_hour(),
            retry_after_secs,
            "Passcode issuance rate limited"
        );
        ApiError::RateLimited { retry_after_secs }
    })
}
