//! Achievement references: the relational half of a record.
//!
//! A reference row carries the canonical workflow status, the student
//! linkage, and the audit timestamps. Exactly one reference exists per
//! document id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DocumentId, Status, achievement::Review};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementReference {
  pub id:             Uuid,
  pub student_id:     Uuid,
  pub document_id:    DocumentId,
  pub status:         Status,
  pub submitted_at:   Option<DateTime<Utc>>,
  pub verified_at:    Option<DateTime<Utc>>,
  pub verified_by:    Option<Uuid>,
  pub rejection_note: Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// A conditional status change: applied only while the row still reads
/// `from`. This is the sole serialisation point between concurrent
/// transitions on the same record.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTransition {
  pub from:           Status,
  pub to:             Status,
  pub at:             DateTime<Utc>,
  pub submitted_at:   Option<DateTime<Utc>>,
  pub verified_at:    Option<DateTime<Utc>>,
  pub verified_by:    Option<Uuid>,
  pub rejection_note: Option<String>,
}

impl ReferenceTransition {
  fn bare(from: Status, to: Status, at: DateTime<Utc>) -> Self {
    Self {
      from,
      to,
      at,
      submitted_at: None,
      verified_at: None,
      verified_by: None,
      rejection_note: None,
    }
  }

  pub fn submit(at: DateTime<Utc>) -> Self {
    Self {
      submitted_at: Some(at),
      ..Self::bare(Status::Draft, Status::Submitted, at)
    }
  }

  pub fn delete(at: DateTime<Utc>) -> Self {
    Self::bare(Status::Draft, Status::Deleted, at)
  }

  /// The reference-side half of a review already written to the document.
  pub fn review(review: &Review) -> Self {
    match review {
      Review::Verified { by, at, .. } => Self {
        verified_at: Some(*at),
        verified_by: Some(*by),
        ..Self::bare(Status::Submitted, Status::Verified, *at)
      },
      Review::Rejected { note, by, at } => Self {
        verified_at: Some(*at),
        verified_by: Some(*by),
        rejection_note: Some(note.clone()),
        ..Self::bare(Status::Submitted, Status::Rejected, *at)
      },
    }
  }
}
