//! Achievement documents: the student-authored content half of a record.
//!
//! The document store keeps one [`Achievement`] per [`DocumentId`]. Content
//! fields are edited by the owner while the paired reference is a draft;
//! workflow fields (`points`, verification metadata, soft-delete marker) are
//! written only by the lifecycle coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::DocumentId;

// ─── Attachments ─────────────────────────────────────────────────────────────

/// Metadata for an uploaded evidence file. The bytes themselves live behind
/// a [`crate::store::BlobSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
  pub file_name:   String,
  pub file_url:    String,
  /// MIME type reported by the uploader.
  pub file_type:   String,
  /// Unset on attachments written by older clients; readers fall back to the
  /// reference's `updated_at`.
  #[serde(default)]
  pub uploaded_at: Option<DateTime<Utc>>,
}

// ─── Achievement ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
  pub id:               DocumentId,
  pub student_id:       Uuid,
  pub title:            String,
  #[serde(default)]
  pub description:      String,
  #[serde(default)]
  pub achievement_type: String,
  /// Free-form, type-specific details (competition level, rank, ...).
  #[serde(default)]
  pub details:          Map<String, Value>,
  #[serde(default)]
  pub attachments:      Vec<Attachment>,
  #[serde(default)]
  pub tags:             Vec<String>,
  /// Zero until a verify transition succeeds.
  #[serde(default)]
  pub points:           i64,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub verified_at:      Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub verified_by:      Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rejection_note:   Option<String>,
  /// Set once the reference has committed a review. Later review writes
  /// are refused.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub review_final:     bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deleted_at:       Option<DateTime<Utc>>,
}

impl Achievement {
  /// Overwrite every review field from `review`. A verify clears any earlier
  /// rejection note and a reject resets points to zero, so the document
  /// only ever reflects the latest decision.
  pub fn apply_review(&mut self, review: &Review) {
    self.verified_by = Some(review.by());
    self.verified_at = Some(review.at());
    self.updated_at = review.at();
    match review {
      Review::Verified { points, .. } => {
        self.points = *points;
        self.rejection_note = None;
      }
      Review::Rejected { note, .. } => {
        self.points = 0;
        self.rejection_note = Some(note.clone());
      }
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Content accepted on create, after field fencing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAchievement {
  #[serde(default)]
  pub title:            String,
  #[serde(default)]
  pub description:      String,
  #[serde(default)]
  pub achievement_type: String,
  #[serde(default)]
  pub details:          Map<String, Value>,
  #[serde(default)]
  pub tags:             Vec<String>,
}

impl NewAchievement {
  pub fn new(title: impl Into<String>) -> Self {
    Self { title: title.into(), ..Self::default() }
  }
}

/// A partial content edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementPatch {
  pub title:            Option<String>,
  pub description:      Option<String>,
  pub achievement_type: Option<String>,
  pub details:          Option<Map<String, Value>>,
  pub tags:             Option<Vec<String>>,
}

impl AchievementPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.achievement_type.is_none()
      && self.details.is_none()
      && self.tags.is_none()
  }
}

/// An uploaded file as handed to the coordinator, before it is stored.
#[derive(Debug, Clone)]
pub struct Upload {
  pub file_name:    String,
  pub content_type: String,
  pub bytes:        Vec<u8>,
}

/// The document-side half of a verify or reject decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Review {
  Verified { points: i64, by: Uuid, at: DateTime<Utc> },
  Rejected { note: String, by: Uuid, at: DateTime<Utc> },
}

impl Review {
  pub fn by(&self) -> Uuid {
    match self {
      Self::Verified { by, .. } | Self::Rejected { by, .. } => *by,
    }
  }

  pub fn at(&self) -> DateTime<Utc> {
    match self {
      Self::Verified { at, .. } | Self::Rejected { at, .. } => *at,
    }
  }
}
