//! Passcode issuance rate limiting.
//!
//! One keyed limiter tracks every email so a single address cannot be
//! flooded with codes, independently of where the requests come from.
//! Keys whose quota has fully replenished are dropped by
//! [`RateLimiterState::retain_recent`], which the cleanup job calls.

use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovRateLimiter,
};
use std::num::NonZeroU32;

type EmailRateLimiter<C> =
    GovRateLimiter<String, DefaultKeyedStateStore<String>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Per-email limiter state, keyed by normalized email.
pub struct RateLimiterState<C: Clock = DefaultClock> {
    limiter: EmailRateLimiter<C>,
    limit_per_hour: u32,
}

impl RateLimiterState<DefaultClock> {
    /// Returns `None` when `limit_per_hour` is 0, which disables limiting.
    pub fn per_hour(limit_per_hour: u32) -> Option<Self> {
        Self::per_hour_with_clock(limit_per_hour, DefaultClock::default())
    }
}

impl<C: Clock> RateLimiterState<C> {
    pub fn per_hour_with_clock(limit_per_hour: u32, clock: C) -> Option<Self> {
        let limit = NonZeroU32::new(limit_per_hour)?;
        Some(Self {
            limiter: GovRateLimiter::new(
                Quota::per_hour(limit),
                DefaultKeyedStateStore::default(),
                clock,
            ),
            limit_per_hour,
        })
    }

    /// Consumes one unit for `email`. Errors carry the retry delay in seconds.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        let key = email.trim().to_lowercase();

        match self.limiter.check_key(&key) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(self.limiter.clock().now());
                Err(wait_time.as_secs().max(1))
            }
        }
    }

    /// Drops keys whose quota has fully replenished and returns how many remain.
    pub fn retain_recent(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    /// Number of emails currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    pub fn limit_per_hour(&self) -> u32 {
        self.limit_per_hour
    }
}

impl<C: Clock> std::fmt::Debug for RateLimiterState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("limit_per_hour", &self.limit_per_hour)
            .field("tracked_keys", &self.limiter.len())
            .finish()
    }
}
