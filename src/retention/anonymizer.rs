//! Anonymize step for analytics opt-in records.

use chrono::{DateTime, Utc};

use super::{next_batch_limit, redaction::Redactor};
use crate::{
    config::RetentionConfig,
    db::{DbPool, DbResult},
    observability::metrics,
};

/// Redact and de-identify every `service_improvement` record past `archive_after`.
///
/// Each record is rewritten by a single conditional update, so a record is
/// either fully anonymized or untouched.
pub async fn anonymize_due(
    db: &DbPool,
    redactor: &Redactor,
    config: &RetentionConfig,
    now: DateTime<Utc>,
) -> DbResult<u64> {
    let conversations = db.conversations();

    if config.safety.dry_run {
        let due = conversations
            .list_anonymizable(now, i64::from(config.safety.batch_size))
            .await?;
        if !due.is_empty() {
            tracing::info!(
                count = due.len(),
                "DRY RUN: Would anonymize {} record(s) due before {}",
                due.len(),
                now
            );
        }
        return Ok(0);
    }

    let max = config.max_records_per_run();
    let mut anonymized: u64 = 0;

    while let Some(limit) = next_batch_limit(config, anonymized, max) {
        let due = conversations.list_anonymizable(now, limit).await?;
        if due.is_empty() {
            break;
        }

        let fetched = due.len();
        let mut progressed = false;
        for record in &due {
            let redacted = redactor.redact(&record.transcript);
            if conversations.anonymize(record.id, &redacted, now).await? {
                anonymized += 1;
                progressed = true;
            }
        }

        if !progressed || (fetched as i64) < limit {
            break;
        }
    }

    if anonymized > 0 {
        tracing::debug!(anonymized, "Anonymized records");
        metrics::record_lifecycle_transition("anonymize", anonymized);
    }

    Ok(anonymized)
}
