use thiserror::Error;

use crate::db::DbError;

/// Errors returned by the engine's caller-facing entry points
/// (erasure requests and ingest).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Malformed input. Nothing was written.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
