use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{ConversationRecord, CreateConversationRecord},
};

/// Counts produced by erasing one subject's records in a single transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubjectErasure {
    /// Main-store records hard-deleted
    pub deleted: u64,
    /// Main-store records kept under a legal hold
    pub retained: u64,
    /// Archive copies hard-deleted alongside
    pub archived_copies_deleted: u64,
}

#[async_trait]
pub trait ConversationRepo: Send + Sync {
    /// Insert a classified conversation record
    async fn create(&self, input: CreateConversationRecord) -> DbResult<ConversationRecord>;

    /// Get a conversation record by ID
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ConversationRecord>>;

    /// List every record linked to a subject, oldest first
    async fn list_by_subject(&self, subject_id: Uuid) -> DbResult<Vec<ConversationRecord>>;

    // ==================== Archive Operations ====================

    /// Records due for archiving.
    ///
    /// Selects `is_archived = false AND archive_after <= now AND anonymized_at IS NULL`,
    /// excluding `service_improvement` records (those are anonymized instead).
    async fn list_archivable(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<ConversationRecord>>;

    /// Flag a record as archived. Returns false if it was already archived,
    /// anonymized, or no longer exists.
    async fn mark_archived(&self, id: Uuid) -> DbResult<bool>;

    // ==================== Anonymization Operations ====================

    /// Records due for anonymization.
    ///
    /// Selects `retention_category = service_improvement AND archive_after <= now
    /// AND anonymized_at IS NULL`, independent of `is_archived`.
    async fn list_anonymizable(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<ConversationRecord>>;

    /// Replace the transcript, swap the subject for the anonymous sentinel and
    /// stamp `anonymized_at`, all in one statement.
    ///
    /// Only applies while `anonymized_at IS NULL`; returns false otherwise.
    async fn anonymize(
        &self,
        id: Uuid,
        redacted_transcript: &str,
        anonymized_at: DateTime<Utc>,
    ) -> DbResult<bool>;

    // ==================== Deletion Operations ====================

    /// Archived records whose `delete_after` has passed (the deleter's safety sweep).
    ///
    /// Never returns anonymized records or records under a legal hold.
    async fn list_expired_archived(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<ConversationRecord>>;

    /// Count legal-hold records that carry an expired `delete_after`.
    ///
    /// These should not exist; the deleter reports them instead of deleting.
    async fn count_expired_legal_holds(&self, now: DateTime<Utc>) -> DbResult<u64>;

    /// Hard-delete a record. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> DbResult<bool>;

    // ==================== Erasure Operations ====================

    /// Hard-delete every record of a subject that is not under a legal hold,
    /// along with their archive copies.
    ///
    /// Counting and deletion share one transaction, so
    /// `deleted + retained` equals the subject's record count at call time.
    async fn erase_subject(&self, subject_id: Uuid) -> DbResult<SubjectErasure>;
}
