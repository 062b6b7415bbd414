//! The lifecycle engine: one pass of Archive, Anonymize, Delete, Notify.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{
    anonymizer, archiver, deleter,
    erasure::{self, ErasureOutcome},
    error::LifecycleResult,
    ingest, notifier,
    redaction::{RedactionError, Redactor},
};
use crate::{
    config::RetentionConfig,
    db::DbPool,
    models::{ConversationRecord, IngestConversation},
    notifications::NotificationChannel,
    observability::metrics,
};

/// Lease name guarding lifecycle passes.
pub const LIFECYCLE_JOB: &str = "retention_lifecycle";

/// A step of the lifecycle pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    Archive,
    Anonymize,
    Delete,
    Notify,
}

impl LifecycleStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStep::Archive => "archive",
            LifecycleStep::Anonymize => "anonymize",
            LifecycleStep::Delete => "delete",
            LifecycleStep::Notify => "notify",
        }
    }
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Results from a single lifecycle pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleRunResult {
    pub archived: u64,
    pub anonymized: u64,
    pub deleted: u64,
    /// Deletion warnings delivered
    pub notified: u64,
    pub notification_failures: u64,
    /// Legal-hold records with an expired `delete_after` left in place
    pub legal_holds_skipped: u64,
    /// True when another runner held the lease and this pass did nothing
    pub skipped: bool,
    /// `"<step>: <message>"` for the step that aborted the pass
    pub errors: Vec<String>,
}

impl LifecycleRunResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Records moved through archive, anonymize or delete.
    pub fn total(&self) -> u64 {
        self.archived + self.anonymized + self.deleted
    }

    fn fail(&mut self, step: impl fmt::Display, error: impl fmt::Display) {
        let step = step.to_string();
        tracing::error!(step = %step, error = %error, "Lifecycle step failed, aborting pass");
        metrics::record_lifecycle_error(&step);
        self.errors.push(format!("{step}: {error}"));
    }
}

/// Runs lifecycle passes and serves erasure and ingest requests against one store.
pub struct LifecycleEngine {
    db: Arc<DbPool>,
    channel: Arc<dyn NotificationChannel>,
    redactor: Redactor,
    config: RetentionConfig,
    holder_id: String,
}

impl LifecycleEngine {
    /// Create an engine with the standard redaction rules.
    pub fn new(
        db: Arc<DbPool>,
        channel: Arc<dyn NotificationChannel>,
        config: RetentionConfig,
    ) -> Result<Self, RedactionError> {
        Ok(Self {
            db,
            channel,
            redactor: Redactor::standard()?,
            config,
            holder_id: format!("warden-{}-{}", std::process::id(), Uuid::new_v4()),
        })
    }

    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// Override the lease holder identity (defaults to pid plus a random suffix).
    pub fn with_holder_id(mut self, holder_id: impl Into<String>) -> Self {
        self.holder_id = holder_id.into();
        self
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Run one lifecycle pass against the current time.
    pub async fn run_lifecycle(&self) -> LifecycleRunResult {
        self.run_lifecycle_at(Utc::now()).await
    }

    /// Run one lifecycle pass as of `now`.
    ///
    /// Never returns an error: the first failing step aborts the rest of the
    /// pass and is reported in `errors`.
    #[tracing::instrument(
        skip(self),
        fields(holder = %self.holder_id, dry_run = self.config.safety.dry_run)
    )]
    pub async fn run_lifecycle_at(&self, now: DateTime<Utc>) -> LifecycleRunResult {
        let mut result = LifecycleRunResult::default();

        if self.config.lease.enabled {
            let acquired = self
                .db
                .job_leases()
                .try_acquire(LIFECYCLE_JOB, &self.holder_id, now, self.config.lease_ttl())
                .await;
            match acquired {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!("Lifecycle lease held by another runner, skipping pass");
                    result.skipped = true;
                    return result;
                }
                Err(e) => {
                    result.fail("lease", e);
                    return result;
                }
            }
        }

        self.run_steps(now, &mut result).await;

        if self.config.lease.enabled
            && let Err(e) = self
                .db
                .job_leases()
                .release(LIFECYCLE_JOB, &self.holder_id)
                .await
        {
            // The lease still expires after its TTL
            tracing::warn!(error = %e, "Failed to release lifecycle lease");
        }

        if result.has_errors() {
            tracing::warn!(
                archived = result.archived,
                anonymized = result.anonymized,
                deleted = result.deleted,
                notified = result.notified,
                errors = result.errors.len(),
                "Lifecycle pass aborted"
            );
        } else {
            tracing::info!(
                archived = result.archived,
                anonymized = result.anonymized,
                deleted = result.deleted,
                notified = result.notified,
                notification_failures = result.notification_failures,
                legal_holds_skipped = result.legal_holds_skipped,
                "Lifecycle pass complete"
            );
        }

        result
    }

    async fn run_steps(&self, now: DateTime<Utc>, result: &mut LifecycleRunResult) {
        match archiver::archive_due(&self.db, &self.config, now).await {
            Ok(archived) => result.archived = archived,
            Err(e) => return result.fail(LifecycleStep::Archive, e),
        }

        match anonymizer::anonymize_due(&self.db, &self.redactor, &self.config, now).await {
            Ok(anonymized) => result.anonymized = anonymized,
            Err(e) => return result.fail(LifecycleStep::Anonymize, e),
        }

        match deleter::delete_expired(&self.db, &self.config, now).await {
            Ok(outcome) => {
                result.deleted = outcome.deleted;
                result.legal_holds_skipped = outcome.legal_holds_skipped;
            }
            Err(e) => return result.fail(LifecycleStep::Delete, e),
        }

        match notifier::notify_upcoming(&self.db, self.channel.as_ref(), &self.config, now).await {
            Ok(outcome) => {
                result.notified = outcome.notified;
                result.notification_failures = outcome.failures;
            }
            Err(e) => result.fail(LifecycleStep::Notify, e),
        }
    }

    /// Resolve a subject's erasure request. Runs regardless of dry-run mode.
    #[tracing::instrument(skip(self))]
    pub async fn process_erasure_request(
        &self,
        subject_id: Uuid,
        request_id: Uuid,
    ) -> LifecycleResult<ErasureOutcome> {
        erasure::process_erasure_request(&self.db, subject_id, request_id, Utc::now()).await
    }

    /// Classify and store a finished transcript.
    pub async fn ingest(&self, input: IngestConversation) -> LifecycleResult<ConversationRecord> {
        ingest::ingest(&self.db, input, Utc::now()).await
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        db::tests::{
            fixtures::{held, now, record, scheduled},
            harness::create_test_db,
        },
        models::{CreateSubject, CreateSubjectContact, LegalBasis, RetentionCategory, Subject},
        notifications::testing::RecordingChannel,
        retention::error::LifecycleError,
    };

    async fn engine_with(
        config: RetentionConfig,
        channel: Arc<RecordingChannel>,
    ) -> (LifecycleEngine, Arc<DbPool>) {
        let db = Arc::new(create_test_db().await);
        let engine = LifecycleEngine::new(db.clone(), channel, config).unwrap();
        (engine, db)
    }

    async fn engine() -> (LifecycleEngine, Arc<DbPool>, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::default());
        let (engine, db) = engine_with(RetentionConfig::default(), channel.clone()).await;
        (engine, db, channel)
    }

    async fn subject(db: &DbPool, name: &str, phone: Option<&str>) -> Subject {
        db.subjects()
            .create(CreateSubject {
                display_name: name.to_string(),
                phone: phone.map(str::to_string),
            })
            .await
            .unwrap()
    }

    async fn contact(db: &DbPool, subject_id: Uuid, phone: &str) {
        db.subjects()
            .add_contact(
                subject_id,
                CreateSubjectContact {
                    display_name: "Daughter".to_string(),
                    phone: phone.to_string(),
                    relationship: Some("daughter".to_string()),
                },
            )
            .await
            .unwrap();
    }

    /// A family-monitoring record whose deletion falls `until_delete` after `now()`.
    async fn expiring(db: &DbPool, subject_id: Uuid, until_delete: Duration) -> ConversationRecord {
        let delete_after = now() + until_delete;
        db.conversations()
            .create(scheduled(
                subject_id,
                RetentionCategory::FamilyMonitoring,
                delete_after - Duration::days(640),
                Some(delete_after),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_pass_runs_every_step() {
        let (engine, db, channel) = engine().await;
        let edith = subject(&db, "Edith", Some("07700 900001")).await;

        db.conversations()
            .create(record(edith.id, RetentionCategory::FamilyMonitoring, Duration::days(91)))
            .await
            .unwrap();
        db.conversations()
            .create(record(edith.id, RetentionCategory::ServiceImprovement, Duration::days(31)))
            .await
            .unwrap();
        let stale = db
            .conversations()
            .create(record(edith.id, RetentionCategory::FamilyMonitoring, Duration::days(731)))
            .await
            .unwrap();
        expiring(&db, edith.id, Duration::days(60) + Duration::hours(12)).await;

        let result = engine.run_lifecycle_at(now()).await;
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert!(!result.skipped);
        // 91-day, 731-day and the soon-expiring record are all past archive_after
        assert_eq!(result.archived, 3);
        assert_eq!(result.anonymized, 1);
        assert_eq!(result.deleted, 1);
        assert_eq!(result.notified, 1);
        assert_eq!(result.total(), 5);

        assert!(db.conversations().get_by_id(stale.id).await.unwrap().is_none());
        assert_eq!(channel.sent_phones(), vec!["07700 900001"]);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let (engine, db, _channel) = engine().await;
        let subject_id = Uuid::new_v4();
        for category in [
            RetentionCategory::FamilyMonitoring,
            RetentionCategory::ServiceImprovement,
            RetentionCategory::EssentialSafeguarding,
        ] {
            db.conversations()
                .create(record(subject_id, category, Duration::days(800)))
                .await
                .unwrap();
        }

        let first = engine.run_lifecycle_at(now()).await;
        assert!(first.total() > 0);

        let second = engine.run_lifecycle_at(now()).await;
        assert_eq!(second, LifecycleRunResult::default());
    }

    #[tokio::test]
    async fn test_anonymized_record_is_never_archived() {
        let (engine, db, _channel) = engine().await;
        let source = db
            .conversations()
            .create(record(Uuid::new_v4(), RetentionCategory::ServiceImprovement, Duration::days(31)))
            .await
            .unwrap();

        let result = engine.run_lifecycle_at(now()).await;
        assert_eq!(result.archived, 0);
        assert_eq!(result.anonymized, 1);

        let later = engine.run_lifecycle_at(now() + Duration::days(1000)).await;
        assert_eq!(later.archived, 0);
        assert_eq!(later.anonymized, 0);
        assert_eq!(later.deleted, 0);

        let after = db.conversations().get_by_id(source.id).await.unwrap().unwrap();
        assert!(!after.is_archived);
        assert!(after.anonymized_at.is_some());
        assert!(
            db.archived_conversations()
                .get_by_original_id(source.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_legal_hold_outlives_deleter() {
        let (engine, db, _channel) = engine().await;
        let source = db
            .conversations()
            .create(held(
                record(Uuid::new_v4(), RetentionCategory::FamilyMonitoring, Duration::days(800)),
                LegalBasis::VitalInterest,
            ))
            .await
            .unwrap();

        let result = engine.run_lifecycle_at(now()).await;
        assert_eq!(result.archived, 1);
        assert_eq!(result.deleted, 0);
        assert_eq!(result.legal_holds_skipped, 1);
        assert!(db.conversations().get_by_id(source.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_erasure_through_engine() {
        let (engine, db, _channel) = engine().await;
        let subject_id = Uuid::new_v4();
        for _ in 0..5 {
            db.conversations()
                .create(record(subject_id, RetentionCategory::FamilyMonitoring, Duration::days(3)))
                .await
                .unwrap();
        }
        for _ in 0..2 {
            db.conversations()
                .create(held(
                    record(subject_id, RetentionCategory::EssentialSafeguarding, Duration::days(3)),
                    LegalBasis::LegalObligation,
                ))
                .await
                .unwrap();
        }
        let request = db.erasure_requests().create(subject_id, now()).await.unwrap();

        let outcome = engine
            .process_erasure_request(subject_id, request.id)
            .await
            .unwrap();
        assert_eq!(outcome.deleted_count, 5);
        assert_eq!(outcome.retained_count, 2);
        assert!(outcome.retention_reason.is_some());

        let err = engine
            .process_erasure_request(subject_id, request.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
    }

    #[tokio::test]
    async fn test_notify_window_boundaries() {
        let (engine, db, channel) = engine().await;
        let edith = subject(&db, "Edith", Some("07700 900001")).await;

        // ~59.9 days: too early
        expiring(&db, edith.id, Duration::days(60) - Duration::hours(2)).await;
        // 60.5 days: inside
        let inside = expiring(&db, edith.id, Duration::days(60) + Duration::hours(12)).await;
        // ~61.1 days: too late
        expiring(&db, edith.id, Duration::days(61) + Duration::hours(2)).await;

        let result = engine.run_lifecycle_at(now()).await;
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert_eq!(result.archived, 3);
        assert_eq!(result.notified, 1);

        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        let (phone, warning) = &sent[0];
        assert_eq!(phone, "07700 900001");
        assert_eq!(warning.subject_name, "Edith");
        assert_eq!(warning.record_count, 1);
        assert_eq!(
            warning.deletion_date,
            crate::notifications::format_deletion_date(inside.delete_after.unwrap())
        );
    }

    #[tokio::test]
    async fn test_warns_subject_and_contacts_once_per_number() {
        let (engine, db, channel) = engine().await;
        let edith = subject(&db, "Edith", Some("07700 900001")).await;
        contact(&db, edith.id, "07700 900002").await;
        contact(&db, edith.id, "+44 7700 900001").await;
        for _ in 0..2 {
            expiring(&db, edith.id, Duration::days(60) + Duration::hours(3)).await;
        }

        let result = engine.run_lifecycle_at(now()).await;
        assert_eq!(result.notified, 2);
        assert_eq!(channel.sent_phones(), vec!["07700 900001", "07700 900002"]);
        assert!(channel.sent().iter().all(|(_, w)| w.record_count == 2));
    }

    #[tokio::test]
    async fn test_warnings_are_not_repeated() {
        let (engine, db, channel) = engine().await;
        let edith = subject(&db, "Edith", Some("07700 900001")).await;
        expiring(&db, edith.id, Duration::days(60) + Duration::hours(20)).await;

        assert_eq!(engine.run_lifecycle_at(now()).await.notified, 1);
        // Still inside the window an hour later
        let again = engine.run_lifecycle_at(now() + Duration::hours(1)).await;
        assert_eq!(again.notified, 0);
        assert_eq!(channel.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_warnings_repeat_without_deduplication() {
        let channel = Arc::new(RecordingChannel::default());
        let config = RetentionConfig {
            deduplicate_warnings: false,
            ..Default::default()
        };
        let (engine, db) = engine_with(config, channel.clone()).await;
        let edith = subject(&db, "Edith", Some("07700 900001")).await;
        expiring(&db, edith.id, Duration::days(60) + Duration::hours(20)).await;

        engine.run_lifecycle_at(now()).await;
        let again = engine.run_lifecycle_at(now() + Duration::hours(1)).await;
        assert_eq!(again.notified, 1);
        assert_eq!(channel.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_channel_failure_does_not_stop_other_sends() {
        let channel = Arc::new(RecordingChannel::failing_for(&["07700 900002"]));
        let (engine, db) = engine_with(RetentionConfig::default(), channel.clone()).await;
        let edith = subject(&db, "Edith", Some("07700 900001")).await;
        contact(&db, edith.id, "07700 900002").await;
        contact(&db, edith.id, "07700 900003").await;
        expiring(&db, edith.id, Duration::days(60) + Duration::hours(6)).await;

        let result = engine.run_lifecycle_at(now()).await;
        assert!(!result.has_errors());
        assert_eq!(result.notified, 2);
        assert_eq!(result.notification_failures, 1);
        assert_eq!(channel.sent_phones(), vec!["07700 900001", "07700 900003"]);
    }

    #[tokio::test]
    async fn test_subject_without_phones_is_skipped() {
        let (engine, db, channel) = engine().await;
        let silent = subject(&db, "Arthur", None).await;
        expiring(&db, silent.id, Duration::days(60) + Duration::hours(6)).await;

        let result = engine.run_lifecycle_at(now()).await;
        assert!(!result.has_errors());
        assert_eq!(result.notified, 0);
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_aborts_remaining_steps() {
        let (engine, db, _channel) = engine().await;
        db.conversations()
            .create(record(Uuid::new_v4(), RetentionCategory::FamilyMonitoring, Duration::days(100)))
            .await
            .unwrap();
        let opted_in = db
            .conversations()
            .create(record(Uuid::new_v4(), RetentionCategory::ServiceImprovement, Duration::days(40)))
            .await
            .unwrap();

        sqlx::query("DROP TABLE archived_conversations")
            .execute(db.sqlite_pool())
            .await
            .unwrap();

        let result = engine.run_lifecycle_at(now()).await;
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("archive: "), "{}", result.errors[0]);
        assert_eq!(result.anonymized, 0);

        let untouched = db.conversations().get_by_id(opted_in.id).await.unwrap().unwrap();
        assert!(untouched.anonymized_at.is_none());
    }

    #[tokio::test]
    async fn test_pass_is_skipped_while_lease_is_held() {
        let (engine, db, _channel) = engine().await;
        db.conversations()
            .create(record(Uuid::new_v4(), RetentionCategory::FamilyMonitoring, Duration::days(100)))
            .await
            .unwrap();
        assert!(
            db.job_leases()
                .try_acquire(LIFECYCLE_JOB, "other-runner", now(), Duration::hours(1))
                .await
                .unwrap()
        );

        let blocked = engine.run_lifecycle_at(now() + Duration::minutes(10)).await;
        assert!(blocked.skipped);
        assert_eq!(blocked.archived, 0);

        let after_expiry = engine.run_lifecycle_at(now() + Duration::hours(2)).await;
        assert!(!after_expiry.skipped);
        assert_eq!(after_expiry.archived, 1);
    }

    #[tokio::test]
    async fn test_lease_is_released_after_pass() {
        let (engine, db, _channel) = engine().await;
        let engine = engine.with_holder_id("runner-a");

        engine.run_lifecycle_at(now()).await;
        assert!(
            db.job_leases()
                .try_acquire(LIFECYCLE_JOB, "runner-b", now(), Duration::hours(1))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_dry_run_mutates_nothing() {
        let channel = Arc::new(RecordingChannel::default());
        let mut config = RetentionConfig::default();
        config.safety.dry_run = true;
        let (engine, db) = engine_with(config, channel.clone()).await;

        let edith = subject(&db, "Edith", Some("07700 900001")).await;
        let archivable = db
            .conversations()
            .create(record(edith.id, RetentionCategory::FamilyMonitoring, Duration::days(100)))
            .await
            .unwrap();
        let opted_in = db
            .conversations()
            .create(record(edith.id, RetentionCategory::ServiceImprovement, Duration::days(40)))
            .await
            .unwrap();
        let soon = expiring(&db, edith.id, Duration::days(60) + Duration::hours(6)).await;
        db.archived_conversations()
            .archive_copy(&soon, now())
            .await
            .unwrap();

        let result = engine.run_lifecycle_at(now()).await;
        assert!(!result.has_errors());
        assert_eq!(result.total(), 0);
        assert_eq!(result.notified, 0);
        assert!(channel.sent().is_empty());

        let a = db.conversations().get_by_id(archivable.id).await.unwrap().unwrap();
        assert!(!a.is_archived);
        let o = db.conversations().get_by_id(opted_in.id).await.unwrap().unwrap();
        assert!(o.anonymized_at.is_none());
        let copy = db
            .archived_conversations()
            .get_by_original_id(soon.id)
            .await
            .unwrap()
            .unwrap();
        assert!(copy.last_notified_at.is_none());
    }

    #[test]
    fn test_result_serializes_for_cli() {
        let result = LifecycleRunResult {
            archived: 2,
            errors: vec!["delete: Database error: boom".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["archived"], 2);
        assert_eq!(json["skipped"], false);
        assert_eq!(json["errors"][0], "delete: Database error: boom");
        assert!(result.has_errors());
    }
}
