use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LegalBasis, RetentionCategory, Sentiment, is_legal_hold};

/// Long-lived archive envelope for a conversation.
///
/// Written once by the archiver; afterwards only the deleter removes it
/// and the notifier stamps `last_notified_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedConversationRecord {
    pub id: Uuid,
    /// Back-reference to the main-store record (not a foreign key)
    pub original_id: Uuid,
    pub subject_id: Uuid,
    pub transcript: String,
    pub sentiment: Sentiment,
    pub legal_basis: LegalBasis,
    pub retention_category: RetentionCategory,
    pub flagged_for_safeguarding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safeguarding_notes: Option<String>,
    pub contains_health_data: bool,
    pub original_created_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
    pub delete_after: Option<DateTime<Utc>>,
    /// When a deletion warning was last sent for this record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl ArchivedConversationRecord {
    pub fn is_legal_hold(&self) -> bool {
        is_legal_hold(self.flagged_for_safeguarding, self.legal_basis)
    }
}
