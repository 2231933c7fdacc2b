//! Read models: never stored, always derived.
//!
//! [`MergedAchievement`] joins a reference and its document under a fixed
//! source-of-truth rule: workflow fields come from the reference, content
//! fields from the document. [`timeline`] reconstructs an ordered event list
//! from that merged state on every read; there is no persisted event log, so
//! intermediate transitions that left no field behind are not recoverable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  DocumentId, Status,
  achievement::{Achievement, Attachment},
  reference::AchievementReference,
};

// ─── Merged view ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedAchievement {
  pub id:                 DocumentId,
  pub reference_id:       Uuid,
  pub student_id:         Uuid,
  // reference
  pub status:             Status,
  pub submitted_at:       Option<DateTime<Utc>>,
  pub verified_at:        Option<DateTime<Utc>>,
  pub verified_by:        Option<Uuid>,
  pub rejection_note:     Option<String>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
  // document
  pub title:              String,
  pub description:        String,
  pub achievement_type:   String,
  pub details:            Map<String, Value>,
  pub attachments:        Vec<Attachment>,
  pub tags:               Vec<String>,
  pub points:             i64,
  pub content_updated_at: DateTime<Utc>,
}

impl MergedAchievement {
  pub fn merge(reference: &AchievementReference, doc: &Achievement) -> Self {
    Self {
      id:                 reference.document_id.clone(),
      reference_id:       reference.id,
      student_id:         reference.student_id,
      status:             reference.status,
      submitted_at:       reference.submitted_at,
      verified_at:        reference.verified_at,
      verified_by:        reference.verified_by,
      rejection_note:     reference.rejection_note.clone(),
      created_at:         reference.created_at,
      updated_at:         reference.updated_at,
      title:              doc.title.clone(),
      description:        doc.description.clone(),
      achievement_type:   doc.achievement_type.clone(),
      details:            doc.details.clone(),
      attachments:        doc.attachments.clone(),
      tags:               doc.tags.clone(),
      points:             doc.points,
      content_updated_at: doc.updated_at,
    }
  }
}

// ─── Timeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  Created,
  AttachmentUploaded,
  Submitted,
  Verified,
  Rejected,
  LastUpdated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
  pub event:       EventKind,
  pub status:      Status,
  pub timestamp:   DateTime<Utc>,
  pub actor:       Option<Uuid>,
  pub description: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file:        Option<Attachment>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub points:      Option<i64>,
}

impl TimelineEvent {
  fn new(
    event: EventKind,
    status: Status,
    timestamp: DateTime<Utc>,
    description: impl Into<String>,
  ) -> Self {
    Self {
      event,
      status,
      timestamp,
      actor: None,
      description: description.into(),
      file: None,
      points: None,
    }
  }
}

/// Derive the event timeline for one record.
///
/// Order: `created`, one `attachment_uploaded` per attachment, `submitted`
/// (if submitted), one of `verified`/`rejected` keyed off the status (if a
/// review timestamp exists), and finally `last_updated`.
pub fn timeline(reference: &AchievementReference, doc: &Achievement) -> Vec<TimelineEvent> {
  let mut events = vec![TimelineEvent::new(
    EventKind::Created,
    Status::Draft,
    reference.created_at,
    "Draft created",
  )];

  for attachment in &doc.attachments {
    let mut ev = TimelineEvent::new(
      EventKind::AttachmentUploaded,
      reference.status,
      attachment.uploaded_at.unwrap_or(reference.updated_at),
      format!("Uploaded file: {}", attachment.file_name),
    );
    ev.file = Some(attachment.clone());
    events.push(ev);
  }

  if let Some(at) = reference.submitted_at {
    let mut ev = TimelineEvent::new(
      EventKind::Submitted,
      Status::Submitted,
      at,
      "Submitted for verification",
    );
    ev.actor = Some(reference.student_id);
    events.push(ev);
  }

  if let Some(at) = reference.verified_at {
    let review = match reference.status {
      Status::Verified => {
        let mut ev = TimelineEvent::new(EventKind::Verified, Status::Verified, at, "Verified");
        ev.points = Some(doc.points);
        Some(ev)
      }
      Status::Rejected => Some(TimelineEvent::new(
        EventKind::Rejected,
        Status::Rejected,
        at,
        format!("Rejected: {}", reference.rejection_note.as_deref().unwrap_or_default()),
      )),
      _ => None,
    };
    if let Some(mut ev) = review {
      ev.actor = reference.verified_by;
      events.push(ev);
    }
  }

  events.push(TimelineEvent::new(
    EventKind::LastUpdated,
    reference.status,
    reference.updated_at,
    "Last update",
  ));

  events
}

/// A merged record together with its derived timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
  pub achievement: MergedAchievement,
  pub timeline:    Vec<TimelineEvent>,
}

impl History {
  pub fn build(reference: &AchievementReference, doc: &Achievement) -> Self {
    Self {
      achievement: MergedAchievement::merge(reference, doc),
      timeline:    timeline(reference, doc),
    }
  }
}
