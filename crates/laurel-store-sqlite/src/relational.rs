//! [`SqliteReferenceStore`]: workflow references, the student directory and
//! role → permission tables on one relational connection.

use std::path::Path;

use chrono::Utc;
use laurel_core::{
  DocumentId, Status,
  reference::{AchievementReference, ReferenceTransition},
  store::{Directory, PermissionStore, ReferenceStore},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::{
  DEFAULT_ROLES, Error, PERMISSIONS, Result,
  encode::{REFERENCE_COLUMNS, RawReference, decode_uuid, encode_dt, encode_uuid},
  schema::REFERENCE_SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Relational store backed by its own SQLite connection.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteReferenceStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteReferenceStore {
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
        conn.execute_batch(REFERENCE_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn reference_where(
    &self,
    clause: &'static str,
    param: String,
  ) -> Result<Option<AchievementReference>> {
    let raw: Option<RawReference> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REFERENCE_COLUMNS} FROM achievement_references WHERE {clause}"),
              rusqlite::params![param],
              RawReference::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReference::into_reference).transpose()
  }

  async fn uuid_where(&self, sql: &'static str, param: Uuid) -> Result<Option<Uuid>> {
    let param = encode_uuid(param);
    let found: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(sql, rusqlite::params![param], |row| row.get(0)).optional()?)
      })
      .await?;

    found.flatten().as_deref().map(decode_uuid).transpose()
  }

  // ── RBAC administration ───────────────────────────────────────────────────

  /// Insert the permission catalogue and the default roles. Safe to run on
  /// every start: existing rows are kept.
  pub async fn seed_default_roles(&self) -> Result<()> {
    for (name, permissions) in DEFAULT_ROLES {
      let permissions: Vec<&str> = match permissions {
        Some(subset) => subset.to_vec(),
        None => PERMISSIONS.iter().map(|(name, _)| *name).collect(),
      };
      self.upsert_role(name, &permissions).await?;
    }
    debug!(roles = DEFAULT_ROLES.len(), "default roles seeded");
    Ok(())
  }

  /// Create `name` if needed and grant it `permissions` from the catalogue.
  /// Grants are additive.
  pub async fn upsert_role(&self, name: &str, permissions: &[&str]) -> Result<Uuid> {
    if let Some(unknown) = permissions
      .iter()
      .find(|p| !PERMISSIONS.iter().any(|(known, _)| known == *p))
    {
      return Err(Error::UnknownPermission((*unknown).to_owned()));
    }

    let name = name.to_owned();
    let grants: Vec<String> = permissions.iter().map(|p| (*p).to_owned()).collect();
    let fresh_id = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());

    let role_id: String = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for (perm, description) in PERMISSIONS {
          let (resource, action) = perm.split_once(':').unwrap_or((*perm, ""));
          tx.execute(
            "INSERT OR IGNORE INTO permissions (id, name, resource, action, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![encode_uuid(Uuid::new_v4()), perm, resource, action, description],
          )?;
        }

        tx.execute(
          "INSERT OR IGNORE INTO roles (id, name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![fresh_id, name, now],
        )?;
        let role_id: String =
          tx.query_row("SELECT id FROM roles WHERE name = ?1", rusqlite::params![name], |row| {
            row.get(0)
          })?;

        for perm in &grants {
          tx.execute(
            "INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
             SELECT ?1, id FROM permissions WHERE name = ?2",
            rusqlite::params![role_id, perm],
          )?;
        }

        tx.commit()?;
        Ok(role_id)
      })
      .await?;

    decode_uuid(&role_id)
  }

  pub async fn role_id(&self, name: &str) -> Result<Option<Uuid>> {
    let name = name.to_owned();
    let id: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT id FROM roles WHERE name = ?1", rusqlite::params![name], |row| {
              row.get(0)
            })
            .optional()?,
        )
      })
      .await?;
    id.as_deref().map(decode_uuid).transpose()
  }

  // ── Directory administration ──────────────────────────────────────────────

  /// The lecturer profile of `user_id`, created if missing.
  pub async fn ensure_lecturer(&self, user_id: Uuid) -> Result<Uuid> {
    self.ensure_profile("lecturers", user_id).await
  }

  /// The student profile of `user_id`, created (without an advisor) if
  /// missing.
  pub async fn ensure_student(&self, user_id: Uuid) -> Result<Uuid> {
    self.ensure_profile("students", user_id).await
  }

  async fn ensure_profile(&self, table: &'static str, user_id: Uuid) -> Result<Uuid> {
    let user_str = encode_uuid(user_id);
    let fresh_id = encode_uuid(Uuid::new_v4());
    let now = encode_dt(Utc::now());

    let id: String = self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT OR IGNORE INTO {table} (id, user_id, created_at) VALUES (?1, ?2, ?3)"),
          rusqlite::params![fresh_id, user_str, now],
        )?;
        Ok(conn.query_row(
          &format!("SELECT id FROM {table} WHERE user_id = ?1"),
          rusqlite::params![user_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    decode_uuid(&id)
  }

  /// Assign (or clear) a student's advisor.
  pub async fn set_advisor(&self, student_id: Uuid, lecturer_id: Option<Uuid>) -> Result<()> {
    let student_str = encode_uuid(student_id);
    let lecturer_str = lecturer_id.map(encode_uuid);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE students SET advisor_id = ?2 WHERE id = ?1",
          rusqlite::params![student_str, lecturer_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::StudentNotFound(student_id));
    }
    Ok(())
  }

  /// Number of reference rows, in any status.
  pub async fn count_references(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM achievement_references", [], |row| row.get(0))?)
      })
      .await?;
    Ok(n as u64)
  }
}

// ─── ReferenceStore impl ─────────────────────────────────────────────────────

impl ReferenceStore for SqliteReferenceStore {
  type Error = Error;

  async fn insert(&self, student_id: Uuid, document_id: DocumentId) -> Result<AchievementReference> {
    let now = Utc::now();
    let reference = AchievementReference {
      id: Uuid::new_v4(),
      student_id,
      document_id,
      status: Status::Draft,
      submitted_at: None,
      verified_at: None,
      verified_by: None,
      rejection_note: None,
      created_at: now,
      updated_at: now,
    };

    let id_str      = encode_uuid(reference.id);
    let student_str = encode_uuid(student_id);
    let doc_str     = reference.document_id.to_string();
    let status_str  = reference.status.as_ref().to_owned();
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievement_references
             (id, student_id, document_id, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, student_str, doc_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(reference)
  }

  async fn get_by_document(&self, document_id: DocumentId) -> Result<Option<AchievementReference>> {
    self.reference_where("document_id = ?1", document_id.to_string()).await
  }

  async fn list_by_students(
    &self,
    student_ids: Vec<Uuid>,
    status: Option<Status>,
  ) -> Result<Vec<AchievementReference>> {
    if student_ids.is_empty() {
      return Ok(Vec::new());
    }

    let placeholders = vec!["?"; student_ids.len()].join(", ");
    let mut sql = format!(
      "SELECT {REFERENCE_COLUMNS} FROM achievement_references WHERE student_id IN ({placeholders})"
    );
    let mut params: Vec<String> = student_ids.into_iter().map(encode_uuid).collect();
    if let Some(status) = status {
      sql.push_str(" AND status = ?");
      params.push(status.as_ref().to_owned());
    }
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    let raws: Vec<RawReference> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawReference::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReference::into_reference).collect()
  }

  async fn list_all(&self, status: Option<Status>) -> Result<Vec<AchievementReference>> {
    let status = status.map(|s| s.as_ref().to_owned());

    let raws: Vec<RawReference> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REFERENCE_COLUMNS} FROM achievement_references
           WHERE (?1 IS NULL OR status = ?1)
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![status], RawReference::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReference::into_reference).collect()
  }

  async fn transition(
    &self,
    document_id: DocumentId,
    transition: ReferenceTransition,
  ) -> Result<Option<AchievementReference>> {
    let doc_str = document_id.to_string();
    let ReferenceTransition {
      from,
      to,
      at,
      submitted_at,
      verified_at,
      verified_by,
      rejection_note,
    } = transition;
    let from_str = from.as_ref().to_owned();
    let to_str = to.as_ref().to_owned();

    // The status predicate is the only serialisation point between
    // concurrent transitions on one record.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE achievement_references
           SET status         = ?3,
               updated_at     = ?4,
               submitted_at   = COALESCE(?5, submitted_at),
               verified_at    = COALESCE(?6, verified_at),
               verified_by    = COALESCE(?7, verified_by),
               rejection_note = COALESCE(?8, rejection_note)
           WHERE document_id = ?1 AND status = ?2",
          rusqlite::params![
            doc_str,
            from_str,
            to_str,
            encode_dt(at),
            submitted_at.map(encode_dt),
            verified_at.map(encode_dt),
            verified_by.map(encode_uuid),
            rejection_note,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      debug!(%document_id, %from, %to, "conditional transition matched no row");
      return Ok(None);
    }
    self.get_by_document(document_id).await
  }
}

// ─── Directory impl ──────────────────────────────────────────────────────────

impl Directory for SqliteReferenceStore {
  type Error = Error;

  async fn student_for_user(&self, user_id: Uuid) -> Result<Option<Uuid>> {
    self.uuid_where("SELECT id FROM students WHERE user_id = ?1", user_id).await
  }

  async fn lecturer_for_user(&self, user_id: Uuid) -> Result<Option<Uuid>> {
    self.uuid_where("SELECT id FROM lecturers WHERE user_id = ?1", user_id).await
  }

  async fn advisor_of(&self, student_id: Uuid) -> Result<Option<Uuid>> {
    self.uuid_where("SELECT advisor_id FROM students WHERE id = ?1", student_id).await
  }

  async fn advisees_of(&self, lecturer_id: Uuid) -> Result<Vec<Uuid>> {
    let lecturer_str = encode_uuid(lecturer_id);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare("SELECT id FROM students WHERE advisor_id = ?1 ORDER BY created_at")?;
        let rows = stmt
          .query_map(rusqlite::params![lecturer_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }
}

// ─── PermissionStore impl ────────────────────────────────────────────────────

impl PermissionStore for SqliteReferenceStore {
  type Error = Error;

  async fn role_has_permission(&self, role_id: Uuid, permission: String) -> Result<bool> {
    let role_str = encode_uuid(role_id);

    let granted = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM role_permissions rp
             JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id = ?1 AND p.name = ?2
           )",
          rusqlite::params![role_str, permission],
          |row| row.get::<_, bool>(0),
        )?)
      })
      .await?;

    Ok(granted)
  }

  async fn role_name(&self, role_id: Uuid) -> Result<Option<String>> {
    let role_str = encode_uuid(role_id);

    let name: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT name FROM roles WHERE id = ?1", rusqlite::params![role_str], |row| {
              row.get(0)
            })
            .optional()?,
        )
      })
      .await?;

    Ok(name)
  }
}
