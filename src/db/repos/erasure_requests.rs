use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CompleteErasureRequest, ErasureRequest},
};

#[async_trait]
pub trait ErasureRequestRepo: Send + Sync {
    /// Record a new pending request
    async fn create(
        &self,
        subject_id: Uuid,
        requested_at: DateTime<Utc>,
    ) -> DbResult<ErasureRequest>;

    /// Get a request by ID
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ErasureRequest>>;

    /// Transition a pending request to completed.
    ///
    /// Returns `DbError::NotFound` for unknown ids and `DbError::Conflict`
    /// if the request is no longer pending.
    async fn complete(&self, id: Uuid, input: CompleteErasureRequest) -> DbResult<ErasureRequest>;
}
