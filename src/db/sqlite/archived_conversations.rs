use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{LEGAL_HOLD_SQL, parse_enum, parse_uuid};
use crate::{
    db::{error::DbResult, repos::ArchivedConversationRepo},
    models::{ArchivedConversationRecord, ConversationRecord},
};

const COLUMNS: &str = "id, original_id, subject_id, transcript, sentiment, legal_basis, \
     retention_category, flagged_for_safeguarding, safeguarding_notes, contains_health_data, \
     original_created_at, archived_at, delete_after, last_notified_at";

pub struct SqliteArchivedConversationRepo {
    pool: SqlitePool,
}

impl SqliteArchivedConversationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &SqliteRow) -> DbResult<ArchivedConversationRecord> {
        Ok(ArchivedConversationRecord {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            original_id: parse_uuid(&row.get::<String, _>("original_id"))?,
            subject_id: parse_uuid(&row.get::<String, _>("subject_id"))?,
            transcript: row.get("transcript"),
            sentiment: parse_enum(&row.get::<String, _>("sentiment"))?,
            legal_basis: parse_enum(&row.get::<String, _>("legal_basis"))?,
            retention_category: parse_enum(&row.get::<String, _>("retention_category"))?,
            flagged_for_safeguarding: row.get("flagged_for_safeguarding"),
            safeguarding_notes: row.get("safeguarding_notes"),
            contains_health_data: row.get("contains_health_data"),
            original_created_at: row.get("original_created_at"),
            archived_at: row.get("archived_at"),
            delete_after: row.get("delete_after"),
            last_notified_at: row.get("last_notified_at"),
        })
    }
}

#[async_trait]
impl ArchivedConversationRepo for SqliteArchivedConversationRepo {
    async fn archive_copy(
        &self,
        source: &ConversationRecord,
        archived_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO archived_conversations (
                id, original_id, subject_id, transcript, sentiment, legal_basis,
                retention_category, flagged_for_safeguarding, safeguarding_notes,
                contains_health_data, original_created_at, archived_at, delete_after
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(original_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(source.id.to_string())
        .bind(source.subject_id.to_string())
        .bind(&source.transcript)
        .bind(source.sentiment.as_str())
        .bind(source.legal_basis.as_str())
        .bind(source.retention_category.as_str())
        .bind(source.flagged_for_safeguarding)
        .bind(&source.safeguarding_notes)
        .bind(source.contains_health_data)
        .bind(source.created_at)
        .bind(archived_at)
        .bind(source.delete_after)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_by_original_id(
        &self,
        original_id: Uuid,
    ) -> DbResult<Option<ArchivedConversationRecord>> {
        let query = format!("SELECT {COLUMNS} FROM archived_conversations WHERE original_id = ?");
        let row = sqlx::query(&query)
            .bind(original_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn list_by_subject(
        &self,
        subject_id: Uuid,
    ) -> DbResult<Vec<ArchivedConversationRecord>> {
        let query = format!(
            "SELECT {COLUMNS} FROM archived_conversations WHERE subject_id = ? \
             ORDER BY original_created_at ASC, id ASC"
        );
        let rows = sqlx::query(&query)
            .bind(subject_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<ArchivedConversationRecord>> {
        let query = format!(
            r#"
            SELECT {COLUMNS} FROM archived_conversations
            WHERE delete_after IS NOT NULL
              AND delete_after <= ?
              AND NOT {LEGAL_HOLD_SQL}
            ORDER BY delete_after ASC, id ASC
            LIMIT ?
            "#
        );
        let rows = sqlx::query(&query)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn count_expired_legal_holds(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let query = format!(
            r#"
            SELECT COUNT(*) FROM archived_conversations
            WHERE delete_after IS NOT NULL
              AND delete_after <= ?
              AND {LEGAL_HOLD_SQL}
            "#
        );
        let count: i64 = sqlx::query_scalar(&query)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM archived_conversations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_due_for_warning(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        only_unnotified: bool,
    ) -> DbResult<Vec<ArchivedConversationRecord>> {
        let notified_filter = if only_unnotified {
            "AND last_notified_at IS NULL"
        } else {
            ""
        };

        let query = format!(
            r#"
            SELECT {COLUMNS} FROM archived_conversations
            WHERE delete_after IS NOT NULL
              AND delete_after >= ?
              AND delete_after < ?
              AND NOT {LEGAL_HOLD_SQL}
              {notified_filter}
            ORDER BY subject_id ASC, delete_after ASC
            "#
        );
        let rows = sqlx::query(&query)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn mark_notified(&self, ids: &[Uuid], notified_at: DateTime<Utc>) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!(
            "UPDATE archived_conversations SET last_notified_at = ? WHERE id IN ({placeholders})"
        );

        let mut q = sqlx::query(&query).bind(notified_at);
        for id in ids {
            q = q.bind(id.to_string());
        }

        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
