//! [`SqliteDocumentStore`]: achievement content as JSON bodies.

use std::path::Path;

use chrono::Utc;
use laurel_core::{
  DocumentId,
  achievement::{Achievement, AchievementPatch, Attachment, NewAchievement, Review},
  store::DocumentStore,
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Result,
  encode::{encode_dt, encode_uuid, other},
  schema::DOCUMENT_SCHEMA,
};

/// Document store backed by its own SQLite connection.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteDocumentStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteDocumentStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(DOCUMENT_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read-modify-write one live document inside an immediate transaction.
  /// Returns `false` when no live document has this id.
  async fn modify<F>(&self, id: DocumentId, edit: F) -> Result<bool>
  where
    F: FnOnce(&mut Achievement) + Send + 'static,
  {
    self
      .modify_if(id, move |doc| {
        edit(doc);
        true
      })
      .await
  }

  /// Like [`Self::modify`], but `edit` may decline by returning `false`, in
  /// which case nothing is written and `false` is returned.
  async fn modify_if<F>(&self, id: DocumentId, edit: F) -> Result<bool>
  where
    F: FnOnce(&mut Achievement) -> bool + Send + 'static,
  {
    let id_str = id.to_string();

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let body: Option<String> = tx
          .query_row(
            "SELECT body FROM documents WHERE id = ?1 AND deleted_at IS NULL",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(body) = body else {
          return Ok(false);
        };

        let mut doc: Achievement = serde_json::from_str(&body).map_err(other)?;
        if !edit(&mut doc) {
          return Ok(false);
        }
        let body = serde_json::to_string(&doc).map_err(other)?;

        tx.execute(
          "UPDATE documents
           SET body = ?2, achievement_type = ?3, updated_at = ?4, deleted_at = ?5
           WHERE id = ?1",
          rusqlite::params![
            id_str,
            body,
            doc.achievement_type,
            encode_dt(doc.updated_at),
            doc.deleted_at.map(encode_dt),
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(found)
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteDocumentStore {
  type Error = crate::Error;

  async fn insert(&self, student_id: Uuid, content: NewAchievement) -> Result<Achievement> {
    let now = Utc::now();
    let doc = Achievement {
      id: DocumentId::generate(),
      student_id,
      title: content.title,
      description: content.description,
      achievement_type: content.achievement_type,
      details: content.details,
      attachments: Vec::new(),
      tags: content.tags,
      points: 0,
      created_at: now,
      updated_at: now,
      verified_at: None,
      verified_by: None,
      rejection_note: None,
      review_final: false,
      deleted_at: None,
    };

    let id_str      = doc.id.to_string();
    let student_str = encode_uuid(student_id);
    let type_str    = doc.achievement_type.clone();
    let body        = serde_json::to_string(&doc)?;
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (id, student_id, achievement_type, body, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, student_str, type_str, body, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(doc)
  }

  async fn get(&self, id: DocumentId) -> Result<Option<Achievement>> {
    let id_str = id.to_string();

    let body: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT body FROM documents WHERE id = ?1 AND deleted_at IS NULL",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(body.as_deref().map(serde_json::from_str::<Achievement>).transpose()?)
  }

  async fn list_by_student(
    &self,
    student_id: Uuid,
    achievement_type: Option<String>,
  ) -> Result<Vec<Achievement>> {
    let student_str = encode_uuid(student_id);

    let bodies: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT body FROM documents
           WHERE student_id = ?1
             AND deleted_at IS NULL
             AND (?2 IS NULL OR achievement_type = ?2)
           ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![student_str, achievement_type], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    bodies
      .iter()
      .map(|b| serde_json::from_str::<Achievement>(b).map_err(crate::Error::from))
      .collect()
  }

  async fn update_content(&self, id: DocumentId, patch: AchievementPatch) -> Result<bool> {
    self
      .modify(id, move |doc| {
        let AchievementPatch { title, description, achievement_type, details, tags } = patch;
        if let Some(title) = title {
          doc.title = title;
        }
        if let Some(description) = description {
          doc.description = description;
        }
        if let Some(achievement_type) = achievement_type {
          doc.achievement_type = achievement_type;
        }
        if let Some(details) = details {
          doc.details = details;
        }
        if let Some(tags) = tags {
          doc.tags = tags;
        }
        doc.updated_at = Utc::now();
      })
      .await
  }

  async fn touch(&self, id: DocumentId) -> Result<bool> {
    self.modify(id, |doc| doc.updated_at = Utc::now()).await
  }

  async fn record_review(&self, id: DocumentId, review: Review) -> Result<bool> {
    self
      .modify_if(id, move |doc| {
        if doc.review_final {
          return false;
        }
        doc.apply_review(&review);
        true
      })
      .await
  }

  async fn finalize_review(&self, id: DocumentId, review: Review) -> Result<bool> {
    self
      .modify(id, move |doc| {
        doc.apply_review(&review);
        doc.review_final = true;
      })
      .await
  }

  async fn push_attachment(&self, id: DocumentId, attachment: Attachment) -> Result<bool> {
    self
      .modify(id, move |doc| {
        doc.attachments.push(attachment);
        doc.updated_at = Utc::now();
      })
      .await
  }

  async fn soft_delete(&self, id: DocumentId) -> Result<bool> {
    self
      .modify(id, |doc| {
        let now = Utc::now();
        doc.deleted_at = Some(now);
        doc.updated_at = now;
      })
      .await
  }
}

impl SqliteDocumentStore {
  /// Number of rows, live or soft-deleted.
  pub async fn count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?))
      .await?;
    Ok(n as u64)
  }
}
