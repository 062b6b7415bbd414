use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_enum, parse_uuid};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::ErasureRequestRepo,
    },
    models::{CompleteErasureRequest, ErasureRequest, ErasureStatus},
};

const COLUMNS: &str = "id, subject_id, status, requested_at, completed_at, deleted_count, \
     retained_count, resolution_notes";

pub struct SqliteErasureRequestRepo {
    pool: SqlitePool,
}

impl SqliteErasureRequestRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &SqliteRow) -> DbResult<ErasureRequest> {
        Ok(ErasureRequest {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            subject_id: parse_uuid(&row.get::<String, _>("subject_id"))?,
            status: parse_enum(&row.get::<String, _>("status"))?,
            requested_at: row.get("requested_at"),
            completed_at: row.get("completed_at"),
            deleted_count: row.get("deleted_count"),
            retained_count: row.get("retained_count"),
            resolution_notes: row.get("resolution_notes"),
        })
    }
}

#[async_trait]
impl ErasureRequestRepo for SqliteErasureRequestRepo {
    async fn create(
        &self,
        subject_id: Uuid,
        requested_at: DateTime<Utc>,
    ) -> DbResult<ErasureRequest> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO erasure_requests (id, subject_id, status, requested_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(subject_id.to_string())
        .bind(ErasureStatus::Pending.as_str())
        .bind(requested_at)
        .execute(&self.pool)
        .await?;

        Ok(ErasureRequest {
            id,
            subject_id,
            status: ErasureStatus::Pending,
            requested_at,
            completed_at: None,
            deleted_count: None,
            retained_count: None,
            resolution_notes: None,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ErasureRequest>> {
        let query = format!("SELECT {COLUMNS} FROM erasure_requests WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn complete(&self, id: Uuid, input: CompleteErasureRequest) -> DbResult<ErasureRequest> {
        let result = sqlx::query(
            r#"
            UPDATE erasure_requests
            SET status = ?, completed_at = ?, deleted_count = ?, retained_count = ?, resolution_notes = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(ErasureStatus::Completed.as_str())
        .bind(input.completed_at)
        .bind(input.deleted_count)
        .bind(input.retained_count)
        .bind(&input.resolution_notes)
        .bind(id.to_string())
        .bind(ErasureStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(existing) => Err(DbError::Conflict(format!(
                    "Erasure request {} is already {}",
                    id,
                    existing.status.as_str()
                ))),
                None => Err(DbError::NotFound),
            };
        }

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}
