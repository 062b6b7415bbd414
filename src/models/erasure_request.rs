use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an erasure request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErasureStatus {
    Pending,
    Completed,
}

impl ErasureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErasureStatus::Pending => "pending",
            ErasureStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ErasureStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ErasureStatus::Pending),
            "completed" => Ok(ErasureStatus::Completed),
            _ => Err(format!("Invalid erasure status: {}", s)),
        }
    }
}

/// A subject's request to exercise the right to erasure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErasureRequest {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub status: ErasureStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retained_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

/// Fields written when a request transitions pending -> completed
#[derive(Debug, Clone)]
pub struct CompleteErasureRequest {
    pub completed_at: DateTime<Utc>,
    pub deleted_count: i64,
    pub retained_count: i64,
    pub resolution_notes: Option<String>,
}
