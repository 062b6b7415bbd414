use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{LEGAL_HOLD_SQL, parse_enum, parse_uuid};
use crate::{
    db::{
        error::DbResult,
        repos::{ConversationRepo, SubjectErasure},
    },
    models::{ANONYMOUS_SUBJECT_ID, ConversationRecord, CreateConversationRecord},
};

const COLUMNS: &str = "id, subject_id, transcript, sentiment, legal_basis, retention_category, \
     flagged_for_safeguarding, safeguarding_notes, contains_health_data, created_at, \
     archive_after, delete_after, is_archived, anonymized_at";

pub struct SqliteConversationRepo {
    pool: SqlitePool,
}

impl SqliteConversationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &SqliteRow) -> DbResult<ConversationRecord> {
        Ok(ConversationRecord {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            subject_id: parse_uuid(&row.get::<String, _>("subject_id"))?,
            transcript: row.get("transcript"),
            sentiment: parse_enum(&row.get::<String, _>("sentiment"))?,
            legal_basis: parse_enum(&row.get::<String, _>("legal_basis"))?,
            retention_category: parse_enum(&row.get::<String, _>("retention_category"))?,
            flagged_for_safeguarding: row.get("flagged_for_safeguarding"),
            safeguarding_notes: row.get("safeguarding_notes"),
            contains_health_data: row.get("contains_health_data"),
            created_at: row.get("created_at"),
            archive_after: row.get("archive_after"),
            delete_after: row.get("delete_after"),
            is_archived: row.get("is_archived"),
            anonymized_at: row.get("anonymized_at"),
        })
    }

    async fn fetch(&self, query: &str, now: DateTime<Utc>, limit: i64) -> DbResult<Vec<ConversationRecord>> {
        let rows = sqlx::query(query)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::from_row).collect()
    }
}

#[async_trait]
impl ConversationRepo for SqliteConversationRepo {
    async fn create(&self, input: CreateConversationRecord) -> DbResult<ConversationRecord> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO conversations (
                id, subject_id, transcript, sentiment, legal_basis, retention_category,
                flagged_for_safeguarding, safeguarding_notes, contains_health_data,
                created_at, archive_after, delete_after, is_archived, anonymized_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL)
            "#,
        )
        .bind(id.to_string())
        .bind(input.subject_id.to_string())
        .bind(&input.transcript)
        .bind(input.sentiment.as_str())
        .bind(input.legal_basis.as_str())
        .bind(input.retention_category.as_str())
        .bind(input.flagged_for_safeguarding)
        .bind(&input.safeguarding_notes)
        .bind(input.contains_health_data)
        .bind(input.created_at)
        .bind(input.archive_after)
        .bind(input.delete_after)
        .execute(&self.pool)
        .await?;

        Ok(ConversationRecord {
            id,
            subject_id: input.subject_id,
            transcript: input.transcript,
            sentiment: input.sentiment,
            legal_basis: input.legal_basis,
            retention_category: input.retention_category,
            flagged_for_safeguarding: input.flagged_for_safeguarding,
            safeguarding_notes: input.safeguarding_notes,
            contains_health_data: input.contains_health_data,
            created_at: input.created_at,
            archive_after: input.archive_after,
            delete_after: input.delete_after,
            is_archived: false,
            anonymized_at: None,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ConversationRecord>> {
        let query = format!("SELECT {COLUMNS} FROM conversations WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn list_by_subject(&self, subject_id: Uuid) -> DbResult<Vec<ConversationRecord>> {
        let query = format!(
            "SELECT {COLUMNS} FROM conversations WHERE subject_id = ? ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&query)
            .bind(subject_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_archivable(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<ConversationRecord>> {
        let query = format!(
            r#"
            SELECT {COLUMNS} FROM conversations
            WHERE is_archived = 0
              AND anonymized_at IS NULL
              AND retention_category <> 'service_improvement'
              AND archive_after <= ?
            ORDER BY archive_after ASC, id ASC
            LIMIT ?
            "#
        );
        self.fetch(&query, now, limit).await
    }

    async fn mark_archived(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET is_archived = 1
            WHERE id = ? AND is_archived = 0 AND anonymized_at IS NULL
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_anonymizable(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<ConversationRecord>> {
        let query = format!(
            r#"
            SELECT {COLUMNS} FROM conversations
            WHERE retention_category = 'service_improvement'
              AND anonymized_at IS NULL
              AND archive_after <= ?
            ORDER BY archive_after ASC, id ASC
            LIMIT ?
            "#
        );
        self.fetch(&query, now, limit).await
    }

    async fn anonymize(
        &self,
        id: Uuid,
        redacted_transcript: &str,
        anonymized_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET subject_id = ?, transcript = ?, anonymized_at = ?
            WHERE id = ? AND anonymized_at IS NULL
            "#,
        )
        .bind(ANONYMOUS_SUBJECT_ID.to_string())
        .bind(redacted_transcript)
        .bind(anonymized_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_expired_archived(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> DbResult<Vec<ConversationRecord>> {
        let query = format!(
            r#"
            SELECT {COLUMNS} FROM conversations
            WHERE is_archived = 1
              AND anonymized_at IS NULL
              AND delete_after IS NOT NULL
              AND delete_after <= ?
              AND NOT {LEGAL_HOLD_SQL}
            ORDER BY delete_after ASC, id ASC
            LIMIT ?
            "#
        );
        self.fetch(&query, now, limit).await
    }

    async fn count_expired_legal_holds(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let query = format!(
            r#"
            SELECT COUNT(*) FROM conversations
            WHERE is_archived = 1
              AND anonymized_at IS NULL
              AND delete_after IS NOT NULL
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
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn erase_subject(&self, subject_id: Uuid) -> DbResult<SubjectErasure> {
        let subject = subject_id.to_string();
        let mut tx = self.pool.begin().await?;

        let retained: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM conversations WHERE subject_id = ? AND {LEGAL_HOLD_SQL}"
        ))
        .bind(&subject)
        .fetch_one(&mut *tx)
        .await?;

        let deleted = sqlx::query(&format!(
            "DELETE FROM conversations WHERE subject_id = ? AND NOT {LEGAL_HOLD_SQL}"
        ))
        .bind(&subject)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let archived_copies_deleted = sqlx::query(&format!(
            "DELETE FROM archived_conversations WHERE subject_id = ? AND NOT {LEGAL_HOLD_SQL}"
        ))
        .bind(&subject)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok(SubjectErasure {
            deleted,
            retained: retained as u64,
            archived_copies_deleted,
        })
    }
}
