//! Archive step: copy due records into the archive store, then flag the source.

use chrono::{DateTime, Utc};

use super::next_batch_limit;
use crate::{
    config::RetentionConfig,
    db::{DbPool, DbResult},
    observability::metrics,
};

/// Archive every record whose `archive_after` has passed.
///
/// The copy is committed before the source is flagged. A crash between the
/// two leaves an unflagged source with a copy already present; the next pass
/// re-selects it, the keyed copy is a no-op, and the flag goes through.
pub async fn archive_due(db: &DbPool, config: &RetentionConfig, now: DateTime<Utc>) -> DbResult<u64> {
    let conversations = db.conversations();
    let archive = db.archived_conversations();

    if config.safety.dry_run {
        let due = conversations
            .list_archivable(now, i64::from(config.safety.batch_size))
            .await?;
        if !due.is_empty() {
            tracing::info!(
                count = due.len(),
                "DRY RUN: Would archive {} record(s) due before {}",
                due.len(),
                now
            );
        }
        return Ok(0);
    }

    let max = config.max_records_per_run();
    let mut archived: u64 = 0;

    while let Some(limit) = next_batch_limit(config, archived, max) {
        let due = conversations.list_archivable(now, limit).await?;
        if due.is_empty() {
            break;
        }

        let fetched = due.len();
        let mut progressed = false;
        for record in &due {
            if !archive.archive_copy(record, now).await? {
                tracing::debug!(
                    record_id = %record.id,
                    "Archive copy already present, flagging source"
                );
            }
            if conversations.mark_archived(record.id).await? {
                archived += 1;
                progressed = true;
            }
        }

        if !progressed || (fetched as i64) < limit {
            break;
        }
    }

    if archived > 0 {
        tracing::debug!(archived, "Archived records");
        metrics::record_lifecycle_transition("archive", archived);
    }

    Ok(archived)
}
