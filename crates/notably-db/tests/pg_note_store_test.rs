//! PostgreSQL note store tests.
//!
//! Run with `DATABASE_URL` pointing at a disposable database and the
//! `migrations` feature enabled; skipped otherwise.

#![cfg(feature = "migrations")]

use notably_core::NoteStore;
use notably_db::test_fixtures::{sample_note, test_database_url};
use notably_db::Database;

async fn setup() -> Option<Database> {
    dotenvy::dotenv().ok();
    let Some(url) = test_database_url() else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };
    let db = Database::connect(&url)
        .await
        .expect("Failed to connect to test database");
    db.migrate().await.expect("Failed to run migrations");
    Some(db)
}

fn unique() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[tokio::test]
async fn test_find_note_is_owner_scoped() {
    let Some(db) = setup().await else { return };
    let note = sample_note("owner-a", &unique());
    db.notes.insert_note(&note).await.expect("insert");

    let found = db
        .notes
        .find_note_by_id_for_owner("owner-a", &note.id)
        .await
        .unwrap();
    assert_eq!(found.map(|n| n.title), Some("Fixture note".to_string()));

    let foreign = db
        .notes
        .find_note_by_id_for_owner("owner-b", &note.id)
        .await
        .unwrap();
    assert!(foreign.is_none(), "Other owners must not see the note");

    db.notes.hard_delete(&note.id).await.unwrap();
}

#[tokio::test]
async fn test_upsert_summary_replaces_previous() {
    let Some(db) = setup().await else { return };
    let note = sample_note("owner-a", &unique());
    db.notes.insert_note(&note).await.expect("insert");

    db.notes.upsert_summary(&note.id, "gpt-oss:20b", "- first").await.unwrap();
    db.notes.upsert_summary(&note.id, "manual", "edited").await.unwrap();

    let loaded = db
        .notes
        .find_note_by_id_for_owner("owner-a", &note.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.summary.as_deref(), Some("edited"));
    assert_eq!(loaded.summary_model.as_deref(), Some("manual"));
    assert_eq!(
        db.notes.summary_model(&note.id).await.unwrap().as_deref(),
        Some("manual")
    );

    db.notes.hard_delete(&note.id).await.unwrap();
}

#[tokio::test]
async fn test_replace_tags_preserves_order() {
    let Some(db) = setup().await else { return };
    let mut note = sample_note("owner-a", &unique());
    note.tags = vec!["old".to_string()];
    db.notes.insert_note(&note).await.expect("insert");

    let tags = vec!["rust".to_string(), "자동화".to_string(), "async".to_string()];
    db.notes.replace_tags(&note.id, &tags).await.unwrap();

    let loaded = db
        .notes
        .find_note_by_id_for_owner("owner-a", &note.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.tags, tags);

    db.notes.hard_delete(&note.id).await.unwrap();
}
