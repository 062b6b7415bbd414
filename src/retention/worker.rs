//! Periodic lifecycle worker for deployments without an external scheduler.

use std::sync::Arc;

use super::runner::LifecycleEngine;

/// Starts the lifecycle worker as a background task.
///
/// The worker runs a pass, sleeps for the configured interval, and repeats
/// until the task is cancelled. Overlap with other runners is prevented by
/// the lifecycle lease, not by this loop.
pub async fn start_lifecycle_worker(engine: Arc<LifecycleEngine>) {
    let config = engine.config();
    if !config.enabled {
        tracing::info!("Lifecycle worker disabled by configuration");
        return;
    }

    let dry_run_msg = if config.safety.dry_run {
        " (DRY RUN)"
    } else {
        ""
    };

    tracing::info!(
        interval_hours = config.interval_hours,
        batch_size = config.safety.batch_size,
        max_records_per_run = config.safety.max_records_per_run,
        deduplicate_warnings = config.deduplicate_warnings,
        lease = config.lease.enabled,
        dry_run = config.safety.dry_run,
        "Starting lifecycle worker{}",
        dry_run_msg
    );

    let interval = config.interval();

    loop {
        let result = engine.run_lifecycle().await;

        if result.skipped {
            tracing::debug!("Lifecycle pass skipped, lease held elsewhere");
        } else if result.has_errors() {
            tracing::error!(
                errors = ?result.errors,
                "Lifecycle pass aborted{}; will retry next interval",
                dry_run_msg
            );
        } else if result.total() > 0 || result.notified > 0 {
            tracing::info!(
                archived = result.archived,
                anonymized = result.anonymized,
                deleted = result.deleted,
                notified = result.notified,
                total = result.total(),
                dry_run = config.safety.dry_run,
                "Lifecycle worker pass complete{}",
                dry_run_msg
            );
        } else {
            tracing::debug!("Lifecycle pass complete, nothing due");
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use super::*;
    use crate::{
        config::RetentionConfig, db::tests::harness::create_test_db,
        notifications::LogChannel,
    };

    #[tokio::test]
    async fn test_disabled_worker_returns_immediately() {
        let db = Arc::new(create_test_db().await);
        let engine =
            LifecycleEngine::new(db, Arc::new(LogChannel), RetentionConfig::default()).unwrap();

        // Would loop forever if enabled
        start_lifecycle_worker(Arc::new(engine)).await;
    }
}
