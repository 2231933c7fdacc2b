//! Ownership and advisor relationships.
//!
//! Every answer is computed from the directory at call time. Nothing is
//! cached across requests, so reassigning a student's advisor takes effect
//! on the very next verify or reject.

use std::sync::Arc;

use laurel_core::{
  DocumentId, Error, Result,
  reference::AchievementReference,
  store::{Directory, ReferenceStore},
};
use uuid::Uuid;

use crate::Deadline;

pub struct OwnershipResolver<R, Dir> {
  references: Arc<R>,
  directory:  Arc<Dir>,
  deadline:   Deadline,
}

impl<R, Dir> OwnershipResolver<R, Dir>
where
  R: ReferenceStore,
  Dir: Directory,
{
  pub fn new(references: Arc<R>, directory: Arc<Dir>, deadline: Deadline) -> Self {
    Self { references, directory, deadline }
  }

  pub async fn student_profile(&self, user_id: Uuid) -> Result<Option<Uuid>> {
    self
      .deadline
      .run("student lookup", self.directory.student_for_user(user_id))
      .await
  }

  pub async fn lecturer_profile(&self, user_id: Uuid) -> Result<Option<Uuid>> {
    self
      .deadline
      .run("lecturer lookup", self.directory.lecturer_for_user(user_id))
      .await
  }

  /// The caller's student id. A missing profile is `Forbidden`, never
  /// `NotFound`.
  pub async fn student_for(&self, user_id: Uuid) -> Result<Uuid> {
    self
      .student_profile(user_id)
      .await?
      .ok_or_else(|| Error::Forbidden("caller has no student profile".into()))
  }

  pub async fn lecturer_for(&self, user_id: Uuid) -> Result<Uuid> {
    self
      .lecturer_profile(user_id)
      .await?
      .ok_or_else(|| Error::Forbidden("caller has no lecturer profile".into()))
  }

  pub async fn is_owner(&self, user_id: Uuid, reference: &AchievementReference) -> Result<bool> {
    Ok(self.student_for(user_id).await? == reference.student_id)
  }

  /// Ownership by document id. An absent or deleted reference is
  /// `NotFound`.
  pub async fn is_owner_of(&self, user_id: Uuid, id: DocumentId) -> Result<bool> {
    let reference = self
      .deadline
      .run("reference read", self.references.get_by_document(id.clone()))
      .await?
      .filter(|r| r.status.is_live())
      .ok_or_else(|| Error::NotFound(format!("achievement {id}")))?;
    self.is_owner(user_id, &reference).await
  }

  pub async fn is_assigned_advisor(&self, lecturer_user_id: Uuid, student_id: Uuid) -> Result<bool> {
    let lecturer = self.lecturer_for(lecturer_user_id).await?;
    let advisor = self
      .deadline
      .run("advisor lookup", self.directory.advisor_of(student_id))
      .await?;
    Ok(advisor == Some(lecturer))
  }

  /// Like [`Self::is_assigned_advisor`], but a caller with no lecturer
  /// profile is simply not the advisor.
  pub async fn advises(&self, user_id: Uuid, student_id: Uuid) -> Result<bool> {
    let Some(lecturer) = self.lecturer_profile(user_id).await? else {
      return Ok(false);
    };
    let advisor = self
      .deadline
      .run("advisor lookup", self.directory.advisor_of(student_id))
      .await?;
    Ok(advisor == Some(lecturer))
  }

  pub async fn advisees_of(&self, lecturer_user_id: Uuid) -> Result<Vec<Uuid>> {
    let lecturer = self.lecturer_for(lecturer_user_id).await?;
    self
      .deadline
      .run("advisee lookup", self.directory.advisees_of(lecturer))
      .await
  }
}
