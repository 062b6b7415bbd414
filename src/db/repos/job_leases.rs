use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::db::error::DbResult;

/// Advisory leases keyed by job name, used to keep scheduled passes from overlapping.
#[async_trait]
pub trait JobLeaseRepo: Send + Sync {
    /// Take the lease for `job_name` if it is free or expired.
    ///
    /// Returns true when `holder` now owns the lease until `now + ttl`.
    async fn try_acquire(
        &self,
        job_name: &str,
        holder: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DbResult<bool>;

    /// Release the lease if `holder` still owns it.
    async fn release(&self, job_name: &str, holder: &str) -> DbResult<bool>;
}
