//! Shared tests for SubjectRepo implementations

use uuid::Uuid;

use crate::{
    db::repos::SubjectRepo,
    models::{CreateSubject, CreateSubjectContact},
};

pub async fn test_create_and_get(repo: &dyn SubjectRepo) {
    let subject = repo
        .create(CreateSubject {
            display_name: "Edith".to_string(),
            phone: Some("+447700900001".to_string()),
        })
        .await
        .expect("create");

    let fetched = repo.get_by_id(subject.id).await.expect("get").expect("exists");
    assert_eq!(fetched, subject);
    assert!(repo.get_by_id(Uuid::new_v4()).await.expect("get").is_none());
}

pub async fn test_contacts_are_scoped_to_subject(repo: &dyn SubjectRepo) {
    let edith = repo
        .create(CreateSubject {
            display_name: "Edith".to_string(),
            phone: None,
        })
        .await
        .expect("create");
    let other = repo
        .create(CreateSubject {
            display_name: "Arthur".to_string(),
            phone: None,
        })
        .await
        .expect("create");

    for (name, phone) in [("Sarah", "+447700900002"), ("Tom", "+447700900003")] {
        repo.add_contact(
            edith.id,
            CreateSubjectContact {
                display_name: name.to_string(),
                phone: phone.to_string(),
                relationship: Some("child".to_string()),
            },
        )
        .await
        .expect("add contact");
    }
    repo.add_contact(
        other.id,
        CreateSubjectContact {
            display_name: "Carer".to_string(),
            phone: "+447700900004".to_string(),
            relationship: None,
        },
    )
    .await
    .expect("add contact");

    let contacts = repo.list_contacts(edith.id).await.expect("list");
    let names: Vec<&str> = contacts.iter().map(|c| c.display_name.as_str()).collect();
    assert_eq!(names, vec!["Sarah", "Tom"]);
    assert!(repo.list_contacts(Uuid::new_v4()).await.expect("list").is_empty());
}

pub async fn test_add_contact_requires_subject(repo: &dyn SubjectRepo) {
    let result = repo
        .add_contact(
            Uuid::new_v4(),
            CreateSubjectContact {
                display_name: "Nobody".to_string(),
                phone: "+447700900005".to_string(),
                relationship: None,
            },
        )
        .await;
    assert!(result.is_err());
}

// ============================================================================
// SQLite Tests
// ============================================================================

mod sqlite_tests {
    use crate::db::{
        sqlite::SqliteSubjectRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteSubjectRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteSubjectRepo::new(pool)
    }

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let repo = create_repo().await;
                super::$name(&repo).await;
            }
        };
    }

    sqlite_test!(test_create_and_get);
    sqlite_test!(test_contacts_are_scoped_to_subject);
    sqlite_test!(test_add_contact_requires_subject);
}
