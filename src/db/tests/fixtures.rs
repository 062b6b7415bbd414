//! Record builders shared by repository and engine tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::models::{CreateConversationRecord, LegalBasis, RetentionCategory, Sentiment};

/// Fixed reference instant so window arithmetic in tests is deterministic
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

/// A record with the category's standard schedule, created `age` before `now()`
pub fn record(subject_id: Uuid, category: RetentionCategory, age: Duration) -> CreateConversationRecord {
    let created_at = now() - age;
    let (archive_after, delete_after) = category.window().schedule(created_at);
    CreateConversationRecord {
        subject_id,
        transcript: "Had a cup of tea with Margaret this morning.".to_string(),
        sentiment: Sentiment::Positive,
        legal_basis: LegalBasis::Consent,
        retention_category: category,
        flagged_for_safeguarding: false,
        safeguarding_notes: None,
        contains_health_data: false,
        created_at,
        archive_after,
        delete_after,
    }
}

/// A record with explicit eligibility timestamps
pub fn scheduled(
    subject_id: Uuid,
    category: RetentionCategory,
    archive_after: DateTime<Utc>,
    delete_after: Option<DateTime<Utc>>,
) -> CreateConversationRecord {
    CreateConversationRecord {
        subject_id,
        transcript: "We talked about the garden.".to_string(),
        sentiment: Sentiment::Neutral,
        legal_basis: LegalBasis::Consent,
        retention_category: category,
        flagged_for_safeguarding: false,
        safeguarding_notes: None,
        contains_health_data: false,
        created_at: archive_after - Duration::days(90),
        archive_after,
        delete_after,
    }
}

/// Turn a record into a safeguarding legal hold
pub fn held(mut input: CreateConversationRecord, basis: LegalBasis) -> CreateConversationRecord {
    input.flagged_for_safeguarding = true;
    input.legal_basis = basis;
    input.safeguarding_notes = Some("Disclosed a fall, escalated to carer".to_string());
    input
}
