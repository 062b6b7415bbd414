//! Pattern-based PII redaction used by the anonymizer.
//!
//! Rules run in order, each over the previous rule's output, and replace
//! every match with a `[LABEL]` placeholder. This is a best-effort
//! baseline: the name rule in particular is a capitalisation heuristic.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedactionError {
    #[error("Invalid {label} redaction pattern: {source}")]
    InvalidPattern {
        label: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled redaction pattern and the placeholder it writes.
#[derive(Debug, Clone)]
pub struct RedactionRule {
    label: String,
    regex: Regex,
    replacement: String,
}

impl RedactionRule {
    /// Compile a rule that replaces matches of `pattern` with `[label]`.
    pub fn new(label: impl Into<String>, pattern: &str) -> Result<Self, RedactionError> {
        let label = label.into();
        let regex = Regex::new(pattern).map_err(|source| RedactionError::InvalidPattern {
            label: label.clone(),
            source,
        })?;
        let replacement = format!("[{label}]");
        Ok(Self {
            label,
            regex,
            replacement,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn apply(&self, text: &str) -> String {
        self.regex
            .replace_all(text, regex::NoExpand(&self.replacement))
            .into_owned()
    }
}

/// Ordered set of redaction rules.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    rules: Vec<RedactionRule>,
}

impl Redactor {
    /// The standard seven-stage rule set.
    pub fn standard() -> Result<Self, RedactionError> {
        let rules = vec![
            // Two or more consecutive capitalised words
            RedactionRule::new("NAME", r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b")?,
            RedactionRule::new(
                "EMAIL",
                r"(?i)[a-z0-9._%+-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)+",
            )?,
            // +44 (optionally with a bracketed trunk "(0)") or 0 prefix, an optional
            // bracketed area code, then 9-12 further digits with space/dash separators
            RedactionRule::new(
                "PHONE",
                r"(?:\+44\s?(?:\(0\))?|\(?\b0)\)?[\s-]?\d(?:\)?[\s-]?\d){8,11}\b",
            )?,
            RedactionRule::new(
                "POSTCODE",
                r"(?i)\b[A-Z]{1,2}\d[A-Z\d]?\s*\d[A-Z]{2}\b",
            )?,
            RedactionRule::new(
                "ADDRESS",
                r"(?i)\b\d{1,5}[a-z]?\s+[a-z]+\s+(?:street|st|road|rd|avenue|ave|lane|ln|close|drive|dr|way|court|crescent|place|grove|gardens|terrace|hill|row|walk|square|mews)\b",
            )?,
            RedactionRule::new(
                "DATE",
                r"\b(?:\d{4}[/.-]\d{1,2}[/.-]\d{1,2}|\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4})\b",
            )?,
            RedactionRule::new("NHS_NUMBER", r"\b\d{3}[\s-]?\d{3}[\s-]?\d{4}\b")?,
        ];
        Ok(Self { rules })
    }

    /// Append a rule that runs after the existing ones.
    pub fn with_rule(mut self, rule: RedactionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[RedactionRule] {
        &self.rules
    }

    pub fn redact(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}
