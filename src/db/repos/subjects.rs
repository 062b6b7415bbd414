use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateSubject, CreateSubjectContact, Subject, SubjectContact},
};

/// Subject -> contacts relationship. The lifecycle engine only reads it;
/// the write methods exist for provisioning and fixtures.
#[async_trait]
pub trait SubjectRepo: Send + Sync {
    async fn create(&self, input: CreateSubject) -> DbResult<Subject>;

    async fn add_contact(
        &self,
        subject_id: Uuid,
        input: CreateSubjectContact,
    ) -> DbResult<SubjectContact>;

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Subject>>;

    /// Secondary contacts linked to a subject
    async fn list_contacts(&self, subject_id: Uuid) -> DbResult<Vec<SubjectContact>>;
}
