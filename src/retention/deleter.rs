//! Delete step: hard-delete expired archive copies and sweep the main store.

use chrono::{DateTime, Utc};

use super::next_batch_limit;
use crate::{
    config::RetentionConfig,
    db::{DbPool, DbResult},
    observability::metrics,
};

/// Counts from one delete step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Records hard-deleted. An archive copy and its main-store source count once.
    pub deleted: u64,
    /// Legal-hold records carrying an expired `delete_after` that were left alone.
    pub legal_holds_skipped: u64,
}

/// Hard-delete everything whose `delete_after` has passed.
///
/// Legal-hold records are never selected. Any that carry an expired
/// `delete_after` are counted and reported at warn level.
pub async fn delete_expired(
    db: &DbPool,
    config: &RetentionConfig,
    now: DateTime<Utc>,
) -> DbResult<DeleteOutcome> {
    let conversations = db.conversations();
    let archive = db.archived_conversations();

    let held_main = conversations.count_expired_legal_holds(now).await?;
    let held_archive = archive.count_expired_legal_holds(now).await?;
    if held_main > 0 || held_archive > 0 {
        tracing::warn!(
            main_store = held_main,
            archive_store = held_archive,
            "Legal-hold records carry an expired delete_after; skipping them"
        );
    }

    let mut outcome = DeleteOutcome {
        deleted: 0,
        legal_holds_skipped: held_main,
    };

    if config.safety.dry_run {
        let batch = i64::from(config.safety.batch_size);
        let copies = archive.list_expired(now, batch).await?;
        let stragglers = conversations.list_expired_archived(now, batch).await?;
        if !copies.is_empty() || !stragglers.is_empty() {
            tracing::info!(
                archive_copies = copies.len(),
                main_store = stragglers.len(),
                "DRY RUN: Would delete {} archive copies and {} main-store records expired before {}",
                copies.len(),
                stragglers.len(),
                now
            );
        }
        return Ok(outcome);
    }

    let max = config.max_records_per_run();

    // Expired archive copies, then their main-store source if still present
    while let Some(limit) = next_batch_limit(config, outcome.deleted, max) {
        let expired = archive.list_expired(now, limit).await?;
        if expired.is_empty() {
            break;
        }

        let fetched = expired.len();
        let mut progressed = false;
        for copy in &expired {
            if !archive.delete(copy.id).await? {
                continue;
            }
            outcome.deleted += 1;
            progressed = true;
            if !conversations.delete(copy.original_id).await? {
                tracing::trace!(
                    record_id = %copy.original_id,
                    "Main-store record already gone"
                );
            }
        }

        if !progressed || (fetched as i64) < limit {
            break;
        }
    }

    // Archived main-store records whose copy never materialized
    let mut swept: u64 = 0;
    while let Some(limit) = next_batch_limit(config, outcome.deleted, max) {
        let expired = conversations.list_expired_archived(now, limit).await?;
        if expired.is_empty() {
            break;
        }

        let fetched = expired.len();
        let mut progressed = false;
        for record in &expired {
            if conversations.delete(record.id).await? {
                outcome.deleted += 1;
                swept += 1;
                progressed = true;
            }
        }

        if !progressed || (fetched as i64) < limit {
            break;
        }
    }

    if swept > 0 {
        tracing::warn!(
            swept,
            "Deleted archived records that had no archive copy"
        );
    }

    if outcome.deleted > 0 {
        tracing::debug!(deleted = outcome.deleted, "Deleted expired records");
        metrics::record_lifecycle_transition("delete", outcome.deleted);
    }

    Ok(outcome)
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::{
        db::tests::{
            fixtures::{held, now, record},
            harness::create_test_db,
        },
        models::{LegalBasis, RetentionCategory},
    };

    /// Create a record, copy it to the archive and flag it, as the archiver would.
    async fn archived(db: &DbPool, input: crate::models::CreateConversationRecord) -> Uuid {
        let source = db.conversations().create(input).await.unwrap();
        db.archived_conversations()
            .archive_copy(&source, now())
            .await
            .unwrap();
        db.conversations().mark_archived(source.id).await.unwrap();
        source.id
    }

    #[tokio::test]
    async fn test_deletes_expired_copy_and_source() {
        let db = create_test_db().await;
        let subject = Uuid::new_v4();
        let expired = archived(
            &db,
            record(subject, RetentionCategory::FamilyMonitoring, Duration::days(731)),
        )
        .await;
        let live = archived(
            &db,
            record(subject, RetentionCategory::FamilyMonitoring, Duration::days(300)),
        )
        .await;

        let outcome = delete_expired(&db, &RetentionConfig::default(), now()).await.unwrap();
        assert_eq!(outcome, DeleteOutcome { deleted: 1, legal_holds_skipped: 0 });

        assert!(db.conversations().get_by_id(expired).await.unwrap().is_none());
        assert!(
            db.archived_conversations()
                .get_by_original_id(expired)
                .await
                .unwrap()
                .is_none()
        );
        assert!(db.conversations().get_by_id(live).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_source_is_not_an_error() {
        let db = create_test_db().await;
        let id = archived(
            &db,
            record(Uuid::new_v4(), RetentionCategory::FamilyMonitoring, Duration::days(800)),
        )
        .await;
        db.conversations().delete(id).await.unwrap();

        let outcome = delete_expired(&db, &RetentionConfig::default(), now()).await.unwrap();
        assert_eq!(outcome.deleted, 1);
    }

    #[tokio::test]
    async fn test_sweeps_archived_record_without_copy() {
        let db = create_test_db().await;
        let source = db
            .conversations()
            .create(record(Uuid::new_v4(), RetentionCategory::FamilyMonitoring, Duration::days(800)))
            .await
            .unwrap();
        db.conversations().mark_archived(source.id).await.unwrap();

        let outcome = delete_expired(&db, &RetentionConfig::default(), now()).await.unwrap();
        assert_eq!(outcome.deleted, 1);
        assert!(db.conversations().get_by_id(source.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_legal_hold_is_never_deleted() {
        let db = create_test_db().await;
        let id = archived(
            &db,
            held(
                record(Uuid::new_v4(), RetentionCategory::FamilyMonitoring, Duration::days(800)),
                LegalBasis::LegalObligation,
            ),
        )
        .await;

        let outcome = delete_expired(&db, &RetentionConfig::default(), now()).await.unwrap();
        assert_eq!(outcome, DeleteOutcome { deleted: 0, legal_holds_skipped: 1 });
        assert!(db.conversations().get_by_id(id).await.unwrap().is_some());
        assert!(
            db.archived_conversations()
                .get_by_original_id(id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_second_pass_deletes_nothing() {
        let db = create_test_db().await;
        archived(
            &db,
            record(Uuid::new_v4(), RetentionCategory::FamilyMonitoring, Duration::days(800)),
        )
        .await;

        let config = RetentionConfig::default();
        assert_eq!(delete_expired(&db, &config, now()).await.unwrap().deleted, 1);
        assert_eq!(delete_expired(&db, &config, now()).await.unwrap().deleted, 0);
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let db = create_test_db().await;
        let id = archived(
            &db,
            record(Uuid::new_v4(), RetentionCategory::FamilyMonitoring, Duration::days(800)),
        )
        .await;

        let mut config = RetentionConfig::default();
        config.safety.dry_run = true;
        assert_eq!(delete_expired(&db, &config, now()).await.unwrap().deleted, 0);
        assert!(db.conversations().get_by_id(id).await.unwrap().is_some());
    }
}
