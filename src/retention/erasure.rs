//! Right-to-erasure processing.
//!
//! A subject's records are hard-deleted at once, regardless of category,
//! archive state or timers, except those under a safeguarding legal hold,
//! which are kept and reported back with the legal basis.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::{LifecycleError, LifecycleResult};
use crate::{
    db::{DbError, DbPool},
    models::{CompleteErasureRequest, ErasureStatus},
    observability::metrics,
};

/// Note stored on the request when held records survive erasure.
pub const RETENTION_REASON: &str = "Records flagged for safeguarding are retained under a \
     legal obligation or vital interest basis, which overrides the right to erasure";

/// What an erasure request did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErasureOutcome {
    pub deleted_count: u64,
    pub retained_count: u64,
    pub archived_copies_deleted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_reason: Option<String>,
}

/// Resolve a pending erasure request for `subject_id`.
///
/// Validation failures leave the request pending and the store untouched.
pub async fn process_erasure_request(
    db: &DbPool,
    subject_id: Uuid,
    request_id: Uuid,
    now: DateTime<Utc>,
) -> LifecycleResult<ErasureOutcome> {
    if subject_id.is_nil() {
        return Err(LifecycleError::Validation(
            "subject_id is required".to_string(),
        ));
    }

    let requests = db.erasure_requests();
    let request = requests.get_by_id(request_id).await?.ok_or_else(|| {
        LifecycleError::Validation(format!("Erasure request {request_id} not found"))
    })?;

    if request.subject_id != subject_id {
        return Err(LifecycleError::Validation(format!(
            "Erasure request {request_id} does not belong to subject {subject_id}"
        )));
    }
    if request.status == ErasureStatus::Completed {
        return Err(LifecycleError::Validation(format!(
            "Erasure request {request_id} is already completed"
        )));
    }

    let erased = db.conversations().erase_subject(subject_id).await?;

    let retention_reason = (erased.retained > 0).then(|| RETENTION_REASON.to_string());
    let input = CompleteErasureRequest {
        completed_at: now,
        deleted_count: erased.deleted as i64,
        retained_count: erased.retained as i64,
        resolution_notes: retention_reason.clone(),
    };

    match requests.complete(request_id, input).await {
        Ok(_) => {}
        Err(DbError::Conflict(msg)) => {
            tracing::warn!(
                request_id = %request_id,
                "Erasure request completed concurrently"
            );
            return Err(LifecycleError::Validation(msg));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        subject_id = %subject_id,
        request_id = %request_id,
        deleted = erased.deleted,
        retained = erased.retained,
        archived_copies_deleted = erased.archived_copies_deleted,
        "Erasure request completed"
    );
    metrics::record_erasure(erased.deleted, erased.retained);

    Ok(ErasureOutcome {
        deleted_count: erased.deleted,
        retained_count: erased.retained,
        archived_copies_deleted: erased.archived_copies_deleted,
        retention_reason,
    })
}
