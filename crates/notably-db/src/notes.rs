//! PostgreSQL note store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use notably_core::{Error, Note, NoteStore, Result};

/// PostgreSQL implementation of [`NoteStore`].
#[derive(Clone)]
pub struct PgNoteStore {
    pool: Pool<Postgres>,
}

impl PgNoteStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a note with its summary and tags, replacing any existing row.
    pub async fn insert_note(&self, note: &Note) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO note (id, owner_id, title, content, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $5)
             ON CONFLICT (id) DO UPDATE
             SET owner_id = EXCLUDED.owner_id, title = EXCLUDED.title,
                 content = EXCLUDED.content, updated_at_utc = EXCLUDED.updated_at_utc",
        )
        .bind(&note.id)
        .bind(&note.owner_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if let Some(summary) = &note.summary {
            sqlx::query(
                "INSERT INTO note_summary (note_id, model, content, updated_at_utc)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (note_id) DO UPDATE
                 SET model = EXCLUDED.model, content = EXCLUDED.content,
                     updated_at_utc = EXCLUDED.updated_at_utc",
            )
            .bind(&note.id)
            .bind(note.summary_model.as_deref().unwrap_or("import"))
            .bind(summary)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        write_tags(&mut tx, &note.id, &note.tags).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    /// Permanently delete a note and its derived rows.
    pub async fn hard_delete(&self, note_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Model label of the stored summary, if any.
    pub async fn summary_model(&self, note_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT model FROM note_summary WHERE note_id = $1")
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("model")))
    }
}

async fn write_tags(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    note_id: &str,
    tags: &[String],
) -> Result<()> {
    sqlx::query("DELETE FROM note_tag WHERE note_id = $1")
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

    for (position, tag) in tags.iter().enumerate() {
        sqlx::query(
            "INSERT INTO note_tag (note_id, tag_name, position) VALUES ($1, $2, $3)
             ON CONFLICT (note_id, tag_name) DO NOTHING",
        )
        .bind(note_id)
        .bind(tag)
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    }
    Ok(())
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn find_note_by_id_for_owner(
        &self,
        owner_id: &str,
        note_id: &str,
    ) -> Result<Option<Note>> {
        let row = sqlx::query(
            "SELECT n.id, n.owner_id, n.title, n.content,
                    s.content AS summary, s.model AS summary_model
             FROM note n
             LEFT JOIN note_summary s ON s.note_id = n.id
             WHERE n.id = $1 AND n.owner_id = $2",
        )
        .bind(note_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            debug!(note_id, "Note not found for owner");
            return Ok(None);
        };

        let tags: Vec<String> =
            sqlx::query("SELECT tag_name FROM note_tag WHERE note_id = $1 ORDER BY position")
                .bind(note_id)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?
                .into_iter()
                .map(|r| r.get("tag_name"))
                .collect();

        Ok(Some(Note {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            content: row.get("content"),
            summary: row.get("summary"),
            summary_model: row.get("summary_model"),
            tags,
        }))
    }

    async fn upsert_summary(&self, note_id: &str, model: &str, content: &str) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO note_summary (note_id, model, content, updated_at_utc)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (note_id) DO UPDATE
             SET model = EXCLUDED.model, content = EXCLUDED.content,
                 updated_at_utc = EXCLUDED.updated_at_utc",
        )
        .bind(note_id)
        .bind(model)
        .bind(content)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("UPDATE note SET updated_at_utc = $1 WHERE id = $2")
            .bind(now)
            .bind(note_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn replace_tags(&self, note_id: &str, tags: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        write_tags(&mut tx, note_id, tags).await?;

        sqlx::query("UPDATE note SET updated_at_utc = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(note_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
