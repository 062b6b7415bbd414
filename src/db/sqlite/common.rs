use uuid::Uuid;

use crate::db::error::{DbError, DbResult};

/// Predicate matching rows under a safeguarding legal hold.
///
/// Must stay in sync with `models::is_legal_hold`.
pub const LEGAL_HOLD_SQL: &str =
    "(flagged_for_safeguarding = 1 AND legal_basis IN ('legal_obligation', 'vital_interest'))";

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

/// Parse an enum column stored as its snake_case string
pub fn parse_enum<T>(s: &str) -> DbResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    s.parse().map_err(DbError::Internal)
}
