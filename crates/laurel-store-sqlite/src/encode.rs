//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings,
//! statuses their snake_case names. Document bodies are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use laurel_core::{DocumentId, Status, reference::AchievementReference};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<Status> {
  Status::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Inside `Connection::call` ───────────────────────────────────────────────

/// Lift a non-SQLite error raised inside a connection closure.
pub fn other<E>(e: E) -> tokio_rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const REFERENCE_COLUMNS: &str = "id, student_id, document_id, status, submitted_at, \
                                     verified_at, verified_by, rejection_note, created_at, \
                                     updated_at";

/// Raw strings read directly from an `achievement_references` row.
pub struct RawReference {
  pub id:             String,
  pub student_id:     String,
  pub document_id:    String,
  pub status:         String,
  pub submitted_at:   Option<String>,
  pub verified_at:    Option<String>,
  pub verified_by:    Option<String>,
  pub rejection_note: Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawReference {
  /// Row mapper for queries selecting [`REFERENCE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      student_id:     row.get(1)?,
      document_id:    row.get(2)?,
      status:         row.get(3)?,
      submitted_at:   row.get(4)?,
      verified_at:    row.get(5)?,
      verified_by:    row.get(6)?,
      rejection_note: row.get(7)?,
      created_at:     row.get(8)?,
      updated_at:     row.get(9)?,
    })
  }

  pub fn into_reference(self) -> Result<AchievementReference> {
    Ok(AchievementReference {
      id:             decode_uuid(&self.id)?,
      student_id:     decode_uuid(&self.student_id)?,
      document_id:    DocumentId::parse(&self.document_id)?,
      status:         decode_status(&self.status)?,
      submitted_at:   self.submitted_at.as_deref().map(decode_dt).transpose()?,
      verified_at:    self.verified_at.as_deref().map(decode_dt).transpose()?,
      verified_by:    self.verified_by.as_deref().map(decode_uuid).transpose()?,
      rejection_note: self.rejection_note,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}
