//! Background job scheduler and job implementations.

mod otp_cleanup;
mod pool_metrics;
mod scheduler;

pub use otp_cleanup::OtpCleanupJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
