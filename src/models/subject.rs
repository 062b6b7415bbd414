use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The individual whose conversations are processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A secondary contact (family member, carer) linked to a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectContact {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub display_name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateSubject {
    pub display_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateSubjectContact {
    pub display_name: String,
    pub phone: String,
    pub relationship: Option<String>,
}
