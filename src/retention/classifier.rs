//! Rule-based classification of finished transcripts.
//!
//! Two fixed vocabularies drive the decision: clinical terms set the
//! health-data flag, distress/harm/neglect terms (or negative sentiment)
//! trigger safeguarding.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{RetentionCategory, Sentiment};

const CLINICAL_TERMS: &[&str] = &[
    "appointment",
    "arthritis",
    "blood pressure",
    "cancer",
    "chemotherapy",
    "dementia",
    "diabetes",
    "diagnosis",
    "dialysis",
    "doctor",
    "dose",
    "gp",
    "heart",
    "hospital",
    "infection",
    "inhaler",
    "insulin",
    "medication",
    "medicine",
    "nurse",
    "operation",
    "pain",
    "pills",
    "prescription",
    "stroke",
    "surgery",
    "symptoms",
    "tablets",
];

const SAFEGUARDING_TERMS: &[&str] = &[
    "abuse",
    "afraid",
    "bleeding",
    "bruise",
    "bruised",
    "can't breathe",
    "crying",
    "die",
    "dying",
    "fall",
    "fallen",
    "fell",
    "frightened",
    "help me",
    "hit me",
    "hungry",
    "hurt",
    "kill myself",
    "lonely",
    "neglect",
    "pain",
    "scared",
    "shouted at",
    "stole",
    "threatened",
    "unsafe",
];

static CLINICAL_RE: LazyLock<Regex> = LazyLock::new(|| vocabulary_regex(CLINICAL_TERMS));
static SAFEGUARDING_RE: LazyLock<Regex> = LazyLock::new(|| vocabulary_regex(SAFEGUARDING_TERMS));

/// Case-insensitive whole-word alternation over a fixed term list.
fn vocabulary_regex(terms: &[&str]) -> Regex {
    let alternation = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("vocabulary terms are escaped")
}

/// Distinct lowercase matches in order of first appearance.
fn matched_terms(re: &Regex, transcript: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for m in re.find_iter(transcript) {
        let term = m.as_str().to_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Outcome of classifying one transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub retention_category: RetentionCategory,
    pub flagged_for_safeguarding: bool,
    pub contains_health_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safeguarding_notes: Option<String>,
}

/// Classify a transcript. Never yields `ServiceImprovement`; that category is
/// only assigned on explicit analytics opt-in at ingest.
pub fn classify(transcript: &str, sentiment: Sentiment) -> Classification {
    let contains_health_data = CLINICAL_RE.is_match(transcript);
    let triggers = matched_terms(&SAFEGUARDING_RE, transcript);
    let negative = sentiment == Sentiment::Negative;

    if triggers.is_empty() && !negative {
        return Classification {
            retention_category: RetentionCategory::FamilyMonitoring,
            flagged_for_safeguarding: false,
            contains_health_data,
            safeguarding_notes: None,
        };
    }

    let matched = if triggers.is_empty() {
        "none".to_string()
    } else {
        triggers.join(", ")
    };

    Classification {
        retention_category: RetentionCategory::EssentialSafeguarding,
        flagged_for_safeguarding: true,
        contains_health_data,
        safeguarding_notes: Some(format!(
            "Matched terms: {matched}; sentiment: {}",
            sentiment.as_str()
        )),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_fall_with_pain_is_safeguarding() {
        let c = classify("I fell and I'm in a lot of pain", Sentiment::Negative);

        assert_eq!(c.retention_category, RetentionCategory::EssentialSafeguarding);
        assert!(c.flagged_for_safeguarding);
        assert!(c.contains_health_data);
        let notes = c.safeguarding_notes.unwrap();
        assert!(notes.contains("fell"));
        assert!(notes.contains("pain"));
        assert!(notes.contains("negative"));
    }

    #[test]
    fn test_benign_transcript_is_family_monitoring() {
        let c = classify("We talked about the garden and the roses", Sentiment::Positive);

        assert_eq!(c.retention_category, RetentionCategory::FamilyMonitoring);
        assert!(!c.flagged_for_safeguarding);
        assert!(!c.contains_health_data);
        assert!(c.safeguarding_notes.is_none());
    }

    #[test]
    fn test_negative_sentiment_alone_triggers() {
        let c = classify("The weather was grey today", Sentiment::Negative);

        assert!(c.flagged_for_safeguarding);
        assert_eq!(
            c.safeguarding_notes.as_deref(),
            Some("Matched terms: none; sentiment: negative")
        );
    }

    #[rstest]
    #[case("My GP changed my tablets", true)]
    #[case("The nurse came round", true)]
    #[case("I need to check my Blood Pressure", true)]
    #[case("Painting the fence", false)]
    #[case("The heartwarming film", false)]
    fn test_health_vocabulary_whole_words(#[case] transcript: &str, #[case] expected: bool) {
        let c = classify(transcript, Sentiment::Neutral);
        assert_eq!(c.contains_health_data, expected);
    }

    #[rstest]
    #[case("I feel so LONELY these days")]
    #[case("Someone stole my purse")]
    #[case("He hurt my arm")]
    fn test_safeguarding_vocabulary(#[case] transcript: &str) {
        let c = classify(transcript, Sentiment::Neutral);
        assert!(c.flagged_for_safeguarding);
        assert_eq!(c.retention_category, RetentionCategory::EssentialSafeguarding);
    }

    #[test]
    fn test_matched_terms_deduplicated_in_order() {
        let c = classify("Pain, then a fall, then more pain", Sentiment::Neutral);
        assert_eq!(
            c.safeguarding_notes.as_deref(),
            Some("Matched terms: pain, fall; sentiment: neutral")
        );
    }

    #[test]
    fn test_never_service_improvement() {
        for sentiment in [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative] {
            let c = classify("Lovely chat about cricket", sentiment);
            assert_ne!(c.retention_category, RetentionCategory::ServiceImprovement);
        }
    }
}
