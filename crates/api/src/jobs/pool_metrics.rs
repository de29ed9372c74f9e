//! Background job recording connection pool gauges.
//!
//! Marking bursts at the start of a class hit the pool all at once, so the
//! job also warns when every connection is checked out.

use sqlx::PgPool;

use super::scheduler::{Job, JobFrequency};

/// Point-in-time view of the pool's connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolUsage {
    pub size: u32,
    pub idle: usize,
    pub max: u32,
}

impl PoolUsage {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle(),
            max: pool.options().get_max_connections(),
        }
    }

    pub fn in_use(&self) -> usize {
        (self.size as usize).saturating_sub(self.idle)
    }

    /// True when the pool is at its ceiling with nothing idle.
    pub fn is_saturated(&self) -> bool {
        self.max > 0 && self.size >= self.max && self.idle == 0
    }
}

/// Records pool gauges every 10 seconds.
pub struct PoolMetricsJob {
    pool: PgPool,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        persistence::metrics::record_pool_metrics(&self.pool);

        let usage = PoolUsage::of(&self.pool);
        if usage.is_saturated() {
            metrics::counter!("database_pool_saturated_total").increment(1);
            tracing::warn!(
                in_use = usage.in_use(),
                max = usage.max,
                "Database pool saturated"
            );
        }
        Ok(())
    }
}
