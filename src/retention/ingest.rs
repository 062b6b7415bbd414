//! Intake of finished transcripts from the conversational pipeline.

use chrono::{DateTime, Utc};
use validator::Validate;

use super::{
    classifier::classify,
    error::{LifecycleError, LifecycleResult},
};
use crate::{
    db::DbPool,
    models::{ConversationRecord, CreateConversationRecord, IngestConversation, RetentionCategory},
};

/// Classify a transcript, stamp its retention windows and insert it.
///
/// An analytics opt-in moves an unflagged record to `service_improvement`.
/// A record flagged for safeguarding keeps its category regardless.
pub async fn ingest(
    db: &DbPool,
    input: IngestConversation,
    now: DateTime<Utc>,
) -> LifecycleResult<ConversationRecord> {
    input
        .validate()
        .map_err(|e| LifecycleError::Validation(e.to_string()))?;
    if input.subject_id.is_nil() {
        return Err(LifecycleError::Validation(
            "subject_id is required".to_string(),
        ));
    }

    let classification = classify(&input.transcript, input.sentiment);
    let retention_category = if input.analytics_opt_in && !classification.flagged_for_safeguarding {
        RetentionCategory::ServiceImprovement
    } else {
        classification.retention_category
    };

    let created_at = input.created_at.unwrap_or(now);
    let (archive_after, delete_after) = retention_category.window().schedule(created_at);

    let record = CreateConversationRecord {
        subject_id: input.subject_id,
        transcript: input.transcript,
        sentiment: input.sentiment,
        legal_basis: input.legal_basis,
        retention_category,
        flagged_for_safeguarding: classification.flagged_for_safeguarding,
        safeguarding_notes: classification.safeguarding_notes,
        contains_health_data: classification.contains_health_data,
        created_at,
        archive_after,
        delete_after,
    };

    record
        .validate()
        .map_err(|e| LifecycleError::Validation(e.to_string()))?;

    let created = db.conversations().create(record).await?;

    if created.flagged_for_safeguarding {
        tracing::warn!(
            record_id = %created.id,
            subject_id = %created.subject_id,
            "Conversation flagged for safeguarding"
        );
    } else {
        tracing::debug!(
            record_id = %created.id,
            category = created.retention_category.as_str(),
            "Conversation ingested"
        );
    }

    Ok(created)
}
