use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{error::DbResult, repos::SubjectRepo},
    models::{CreateSubject, CreateSubjectContact, Subject, SubjectContact},
};

pub struct SqliteSubjectRepo {
    pool: SqlitePool,
}

impl SqliteSubjectRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubjectRepo for SqliteSubjectRepo {
    async fn create(&self, input: CreateSubject) -> DbResult<Subject> {
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO subjects (id, display_name, phone) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(&input.display_name)
            .bind(&input.phone)
            .execute(&self.pool)
            .await?;

        Ok(Subject {
            id,
            display_name: input.display_name,
            phone: input.phone,
        })
    }

    async fn add_contact(
        &self,
        subject_id: Uuid,
        input: CreateSubjectContact,
    ) -> DbResult<SubjectContact> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO subject_contacts (id, subject_id, display_name, phone, relationship)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(subject_id.to_string())
        .bind(&input.display_name)
        .bind(&input.phone)
        .bind(&input.relationship)
        .execute(&self.pool)
        .await?;

        Ok(SubjectContact {
            id,
            subject_id,
            display_name: input.display_name,
            phone: input.phone,
            relationship: input.relationship,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Subject>> {
        let row = sqlx::query("SELECT id, display_name, phone FROM subjects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Subject {
                id: parse_uuid(&row.get::<String, _>("id"))?,
                display_name: row.get("display_name"),
                phone: row.get("phone"),
            })
        })
        .transpose()
    }

    async fn list_contacts(&self, subject_id: Uuid) -> DbResult<Vec<SubjectContact>> {
        let rows = sqlx::query(
            r#"
            SELECT id, subject_id, display_name, phone, relationship
            FROM subject_contacts
            WHERE subject_id = ?
            ORDER BY display_name ASC, id ASC
            "#,
        )
        .bind(subject_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(SubjectContact {
                    id: parse_uuid(&row.get::<String, _>("id"))?,
                    subject_id: parse_uuid(&row.get::<String, _>("subject_id"))?,
                    display_name: row.get("display_name"),
                    phone: row.get("phone"),
                    relationship: row.get("relationship"),
                })
            })
            .collect()
    }
}
