use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{ArchivedConversationRecord, ConversationRecord},
};

#[async_trait]
pub trait ArchivedConversationRepo: Send + Sync {
    /// Copy a main-store record into the archive.
    ///
    /// Keyed on `original_id`: returns false (and writes nothing) if a copy
    /// already exists, which makes archive retries idempotent.
    async fn archive_copy(
        &self,
        source: &ConversationRecord,
        archived_at: DateTime<Utc>,
    ) -> DbResult<bool>;

    /// Get the archive copy of a main-store record
    async fn get_by_original_id(
        &self,
        original_id: Uuid,
    ) -> DbResult<Option<ArchivedConversationRecord>>;

    /// List a subject's archive copies, oldest first
    async fn list_by_subject(&self, subject_id: Uuid)
    -> DbResult<Vec<ArchivedConversationRecord>>;

    /// Archive copies whose `delete_after` is set and has passed.
    ///
    /// Never returns copies under a legal hold.
    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<ArchivedConversationRecord>>;

    /// Count legal-hold copies that carry an expired `delete_after`.
    async fn count_expired_legal_holds(&self, now: DateTime<Utc>) -> DbResult<u64>;

    /// Hard-delete an archive copy. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> DbResult<bool>;

    /// Archive copies scheduled for deletion within `[from, until)`.
    ///
    /// With `only_unnotified`, copies that already carry `last_notified_at`
    /// are skipped.
    async fn list_due_for_warning(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        only_unnotified: bool,
    ) -> DbResult<Vec<ArchivedConversationRecord>>;

    /// Stamp `last_notified_at` on the given copies. Returns rows updated.
    async fn mark_notified(&self, ids: &[Uuid], notified_at: DateTime<Utc>) -> DbResult<u64>;
}
