use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Subject id written over `subject_id` when a record is anonymized.
///
/// The nil UUID is never issued to a real subject, so anonymized rows can
/// never be re-linked through a subject lookup or an erasure request.
pub const ANONYMOUS_SUBJECT_ID: Uuid = Uuid::nil();

/// Sentiment label attached by the upstream conversational pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" | "pos" => Ok(Sentiment::Positive),
            "neutral" | "neu" => Ok(Sentiment::Neutral),
            "negative" | "neg" => Ok(Sentiment::Negative),
            _ => Err(format!("Invalid sentiment: {}", s)),
        }
    }
}

/// Lawful ground for processing a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalBasis {
    Consent,
    LegalObligation,
    VitalInterest,
    LegitimateInterest,
}

impl LegalBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegalBasis::Consent => "consent",
            LegalBasis::LegalObligation => "legal_obligation",
            LegalBasis::VitalInterest => "vital_interest",
            LegalBasis::LegitimateInterest => "legitimate_interest",
        }
    }

    /// Bases under which the right to erasure does not apply to safeguarding data.
    pub fn overrides_erasure(&self) -> bool {
        matches!(self, LegalBasis::LegalObligation | LegalBasis::VitalInterest)
    }
}

impl std::str::FromStr for LegalBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consent" => Ok(LegalBasis::Consent),
            "legal_obligation" => Ok(LegalBasis::LegalObligation),
            "vital_interest" => Ok(LegalBasis::VitalInterest),
            "legitimate_interest" => Ok(LegalBasis::LegitimateInterest),
            _ => Err(format!("Invalid legal basis: {}", s)),
        }
    }
}

/// Policy bucket governing retention duration and anonymization eligibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionCategory {
    EssentialSafeguarding,
    FamilyMonitoring,
    ServiceImprovement,
}

impl RetentionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionCategory::EssentialSafeguarding => "essential_safeguarding",
            RetentionCategory::FamilyMonitoring => "family_monitoring",
            RetentionCategory::ServiceImprovement => "service_improvement",
        }
    }

    /// Fixed retention windows for this category.
    pub fn window(&self) -> RetentionWindow {
        match self {
            RetentionCategory::EssentialSafeguarding => RetentionWindow {
                archive_after_days: 365,
                delete_after_days: None,
            },
            RetentionCategory::FamilyMonitoring => RetentionWindow {
                archive_after_days: 90,
                delete_after_days: Some(730),
            },
            // Anonymized at `archive_after`; anonymized rows ignore `delete_after`.
            RetentionCategory::ServiceImprovement => RetentionWindow {
                archive_after_days: 30,
                delete_after_days: None,
            },
        }
    }
}

impl std::str::FromStr for RetentionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "essential_safeguarding" => Ok(RetentionCategory::EssentialSafeguarding),
            "family_monitoring" => Ok(RetentionCategory::FamilyMonitoring),
            "service_improvement" => Ok(RetentionCategory::ServiceImprovement),
            _ => Err(format!("Invalid retention category: {}", s)),
        }
    }
}

/// Archive and deletion offsets, in days from `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow {
    pub archive_after_days: i64,
    /// `None` means retain indefinitely.
    pub delete_after_days: Option<i64>,
}

impl RetentionWindow {
    /// Compute `(archive_after, delete_after)` for a record created at `created_at`.
    pub fn schedule(&self, created_at: DateTime<Utc>) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        let archive_after = created_at + Duration::days(self.archive_after_days);
        let delete_after = self
            .delete_after_days
            .map(|days| created_at + Duration::days(days));
        (archive_after, delete_after)
    }
}

/// Whether a record is under a safeguarding legal hold.
///
/// Held records are never selected by the automatic deleter and are
/// retained through erasure requests.
pub fn is_legal_hold(flagged_for_safeguarding: bool, legal_basis: LegalBasis) -> bool {
    flagged_for_safeguarding && legal_basis.overrides_erasure()
}

/// A conversation transcript in the main store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub transcript: String,
    pub sentiment: Sentiment,
    pub legal_basis: LegalBasis,
    pub retention_category: RetentionCategory,
    pub flagged_for_safeguarding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safeguarding_notes: Option<String>,
    pub contains_health_data: bool,
    pub created_at: DateTime<Utc>,
    /// Archive (or anonymization) eligibility timestamp
    pub archive_after: DateTime<Utc>,
    /// Hard-delete eligibility timestamp. `None` = retain indefinitely
    pub delete_after: Option<DateTime<Utc>>,
    pub is_archived: bool,
    /// Set once, when the record is irreversibly anonymized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymized_at: Option<DateTime<Utc>>,
}

impl ConversationRecord {
    pub fn is_legal_hold(&self) -> bool {
        is_legal_hold(self.flagged_for_safeguarding, self.legal_basis)
    }

    pub fn is_anonymized(&self) -> bool {
        self.anonymized_at.is_some()
    }
}

/// Fully-resolved record to insert into the main store
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_schedule"))]
pub struct CreateConversationRecord {
    pub subject_id: Uuid,
    #[validate(length(min = 1))]
    pub transcript: String,
    pub sentiment: Sentiment,
    pub legal_basis: LegalBasis,
    pub retention_category: RetentionCategory,
    pub flagged_for_safeguarding: bool,
    pub safeguarding_notes: Option<String>,
    pub contains_health_data: bool,
    pub created_at: DateTime<Utc>,
    pub archive_after: DateTime<Utc>,
    pub delete_after: Option<DateTime<Utc>>,
}

fn validate_schedule(input: &CreateConversationRecord) -> Result<(), validator::ValidationError> {
    if let Some(delete_after) = input.delete_after
        && delete_after < input.archive_after
    {
        let mut err = validator::ValidationError::new("delete_before_archive");
        err.message = Some("delete_after must not precede archive_after".into());
        return Err(err);
    }
    Ok(())
}

/// A finished transcript handed over by the conversational pipeline
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IngestConversation {
    pub subject_id: Uuid,
    #[validate(length(min = 1))]
    pub transcript: String,
    pub sentiment: Sentiment,
    pub legal_basis: LegalBasis,
    /// Whether the subject explicitly opted in to analytics use of this transcript
    #[serde(default)]
    pub analytics_opt_in: bool,
    /// Defaults to ingest time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
