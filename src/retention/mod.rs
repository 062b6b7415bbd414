//! Conversation retention lifecycle.
//!
//! One lifecycle pass runs four steps in order:
//! 1. Archive records past `archive_after` into the archive store
//! 2. Anonymize analytics opt-in records in place
//! 3. Hard-delete archived records past `delete_after`
//! 4. Warn subjects and contacts 60 days ahead of deletion
//!
//! Records under a safeguarding legal hold are never deleted, neither by
//! the pass nor by an erasure request. All steps are batched, capped per
//! run, safe to retry, and support dry-run mode.

mod anonymizer;
mod archiver;
pub mod classifier;
mod deleter;
mod erasure;
mod error;
mod ingest;
mod notifier;
pub mod redaction;
mod runner;
mod worker;

pub use classifier::{Classification, classify};
pub use deleter::DeleteOutcome;
pub use erasure::{ErasureOutcome, RETENTION_REASON};
pub use error::{LifecycleError, LifecycleResult};
pub use notifier::{NotifyOutcome, WARNING_LEAD_DAYS, WARNING_WINDOW_DAYS, warning_window};
pub use redaction::{RedactionError, RedactionRule, Redactor};
pub use runner::{LIFECYCLE_JOB, LifecycleEngine, LifecycleRunResult, LifecycleStep};
pub use worker::start_lifecycle_worker;

use crate::config::RetentionConfig;

/// Row limit for the next selection batch, or `None` once `done` reaches `max`.
fn next_batch_limit(config: &RetentionConfig, done: u64, max: u64) -> Option<i64> {
    if done >= max {
        return None;
    }
    let remaining = max - done;
    Some(u64::from(config.safety.batch_size).min(remaining) as i64)
}
