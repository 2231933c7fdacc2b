//! Field-level write fencing for owner-supplied payloads.
//!
//! Each endpoint declares two lists. A key on the `reject` list fails the
//! whole request with [`Error::Validation`]; a key on the `strip` list is
//! dropped without comment. Whatever survives is deserialised into the typed
//! content structs, which ignore unknown keys.

use laurel_core::{
  Error, Result,
  achievement::{AchievementPatch, NewAchievement},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy {
  pub reject: &'static [&'static str],
  pub strip:  &'static [&'static str],
}

const WORKFLOW_FIELDS: &[&str] = &[
  "points",
  "status",
  "verifiedAt",
  "verified_at",
  "verifiedBy",
  "verified_by",
  "rejectionNote",
  "rejection_note",
  "updatedAt",
  "updated_at",
  "attachments",
  "deletedAt",
  "deleted_at",
];

pub const CREATE: FieldPolicy = FieldPolicy {
  reject: &["_id", "id"],
  strip:  &[
    "studentId",
    "student_id",
    "points",
    "status",
    "verifiedAt",
    "verified_at",
    "verifiedBy",
    "verified_by",
    "rejectionNote",
    "rejection_note",
    "createdAt",
    "created_at",
    "updatedAt",
    "updated_at",
    "attachments",
    "deletedAt",
    "deleted_at",
  ],
};

pub const UPDATE: FieldPolicy = FieldPolicy {
  reject: &["_id", "id", "createdAt", "created_at", "studentId", "student_id"],
  strip:  WORKFLOW_FIELDS,
};

impl FieldPolicy {
  pub fn apply(&self, mut payload: Map<String, Value>) -> Result<Map<String, Value>> {
    if let Some(field) = self.reject.iter().find(|f| payload.contains_key(**f)) {
      return Err(Error::Validation(format!("field {field:?} cannot be set")));
    }
    for field in self.strip {
      payload.remove(*field);
    }
    Ok(payload)
  }
}

fn decode<T: DeserializeOwned>(payload: Map<String, Value>) -> Result<T> {
  serde_json::from_value(Value::Object(payload))
    .map_err(|e| Error::Validation(format!("malformed payload: {e}")))
}

/// Fence and validate a create payload.
pub fn new_achievement(payload: Map<String, Value>) -> Result<NewAchievement> {
  let content: NewAchievement = decode(CREATE.apply(payload)?)?;
  if content.title.trim().is_empty() {
    return Err(Error::Validation("title is required".into()));
  }
  Ok(content)
}

/// Fence and validate an update payload.
pub fn patch(payload: Map<String, Value>) -> Result<AchievementPatch> {
  let patch: AchievementPatch = decode(UPDATE.apply(payload)?)?;
  if patch.is_empty() {
    return Err(Error::Validation("no updatable fields".into()));
  }
  if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
    return Err(Error::Validation("title must not be blank".into()));
  }
  Ok(patch)
}
