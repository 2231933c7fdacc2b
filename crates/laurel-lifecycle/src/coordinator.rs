//! [`Coordinator`]: the achievement state machine driven across the
//! document store and the reference store.
//!
//! # Guard order
//!
//! Every operation on an existing record runs, in order: permission check,
//! existence (reference and live document), relationship (owner, assigned
//! advisor, or reader), state precondition, payload validation. Any failure
//! returns before the first write.
//!
//! # Write order
//!
//! | Operation | First write | Second write |
//! |---|---|---|
//! | create | document insert | reference insert |
//! | update | document content | (none) |
//! | delete | document soft delete | reference → `deleted` |
//! | submit | document touch | reference → `submitted` |
//! | verify / reject | document review fields | reference → `verified` / `rejected` |
//!
//! The first write is never rolled back. A failed second write surfaces as
//! [`Error::StoreFailure`]; for submit, verify and reject it is flagged
//! retriable, since the first write can be repeated while the reference
//! still holds its old status.
//!
//! A committed review is written to the document a second time and sealed
//! there. Review writes that arrive after the seal are refused, so the
//! document's points and reviewer always match the reference that won.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use laurel_core::{
  Action, DocumentId, Error, Result, Status,
  achievement::{Achievement, Attachment, Review, Upload},
  principal::Principal,
  reference::{AchievementReference, ReferenceTransition},
  report::{Scope, ScopedStatistics, Statistics, StudentReport},
  store::{BlobSink, Directory, DocumentStore, PermissionStore, ReferenceStore},
  view::{History, MergedAchievement},
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{AuthorizationResolver, Deadline, OwnershipResolver, fence};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
  pub store_timeout: Duration,
  /// Role name whose holders may read any record.
  pub admin_role:    String,
}

impl Default for CoordinatorConfig {
  fn default() -> Self {
    Self {
      store_timeout: Duration::from_secs(5),
      admin_role:    "admin".into(),
    }
  }
}

/// The relationship an action demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
  Owner,
  Advisor,
  /// Owner, assigned advisor, or administrator.
  Reader,
}

impl Relation {
  fn of(action: Action) -> Self {
    match action {
      Action::Verify | Action::Reject => Self::Advisor,
      Action::Read | Action::ViewAdvisees => Self::Reader,
      _ => Self::Owner,
    }
  }
}

/// A record that passed every guard.
struct Admitted {
  reference: AchievementReference,
  document:  Achievement,
}

pub struct Coordinator<D, R, Dir, P> {
  documents:  Arc<D>,
  references: Arc<R>,
  ownership:  OwnershipResolver<R, Dir>,
  authz:      AuthorizationResolver<P>,
  deadline:   Deadline,
}

impl<D, R, Dir, P> Coordinator<D, R, Dir, P>
where
  D: DocumentStore,
  R: ReferenceStore,
  Dir: Directory,
  P: PermissionStore,
{
  pub fn new(
    documents: Arc<D>,
    references: Arc<R>,
    directory: Arc<Dir>,
    permissions: Arc<P>,
    config: CoordinatorConfig,
  ) -> Self {
    let deadline = Deadline::new(config.store_timeout);
    Self {
      ownership: OwnershipResolver::new(references.clone(), directory, deadline),
      authz: AuthorizationResolver::new(permissions, deadline, config.admin_role),
      documents,
      references,
      deadline,
    }
  }

  pub fn ownership(&self) -> &OwnershipResolver<R, Dir> { &self.ownership }

  // ── Guards ────────────────────────────────────────────────────────────────

  async fn load(&self, id: &DocumentId) -> Result<(AchievementReference, Achievement)> {
    let reference = self
      .deadline
      .run("reference read", self.references.get_by_document(id.clone()))
      .await?
      .filter(|r| r.status.is_live())
      .ok_or_else(|| Error::NotFound(format!("achievement {id}")))?;
    // A reference whose document is gone was half-deleted; it stays gone.
    let document = self.document(id).await?;
    Ok((reference, document))
  }

  async fn document(&self, id: &DocumentId) -> Result<Achievement> {
    self
      .deadline
      .run("document read", self.documents.get(id.clone()))
      .await?
      .ok_or_else(|| Error::NotFound(format!("achievement {id}")))
  }

  async fn check_relation(
    &self,
    principal: &Principal,
    reference: &AchievementReference,
    relation: Relation,
  ) -> Result<()> {
    let allowed = match relation {
      Relation::Owner => self.ownership.is_owner(principal.user_id, reference).await?,
      Relation::Advisor => {
        self
          .ownership
          .is_assigned_advisor(principal.user_id, reference.student_id)
          .await?
      }
      Relation::Reader => self.may_read(principal, reference.student_id).await?,
    };
    if allowed {
      return Ok(());
    }
    Err(Error::Forbidden(match relation {
      Relation::Owner => "not the owner of this achievement".into(),
      Relation::Advisor => "not the assigned advisor of this student".into(),
      Relation::Reader => "no access to this achievement".into(),
    }))
  }

  /// Owner, current advisor, or administrator of `student_id`'s records.
  async fn may_read(&self, principal: &Principal, student_id: Uuid) -> Result<bool> {
    Ok(
      self.ownership.student_profile(principal.user_id).await? == Some(student_id)
        || self.ownership.advises(principal.user_id, student_id).await?
        || self.authz.is_administrator(principal).await?,
    )
  }

  /// Permission, existence, relationship and state, in that order.
  async fn admit(
    &self,
    principal: &Principal,
    id: &DocumentId,
    action: Action,
  ) -> Result<Admitted> {
    let admitted = async {
      self.authz.require(principal, action).await?;
      let (reference, document) = self.load(id).await?;
      self.check_relation(principal, &reference, Relation::of(action)).await?;
      reference.status.apply(action)?;
      Ok(Admitted { reference, document })
    }
    .await;
    if let Err(e) = &admitted {
      debug!(document_id = %id, %action, error = %e, "guard rejected request");
    }
    admitted
  }

  /// Explain a conditional transition that matched no row: the status moved
  /// between the guard and the write.
  async fn lost_race(&self, id: &DocumentId, action: Action) -> Error {
    let current = match self
      .deadline
      .run("reference read", self.references.get_by_document(id.clone()))
      .await
    {
      Ok(Some(r)) => r.status,
      Ok(None) => return Error::NotFound(format!("achievement {id}")),
      Err(e) => return e,
    };
    match current.apply(action) {
      Err(e) => e,
      Ok(_) => Error::InvalidTransition { from: current, action },
    }
  }

  async fn commit_transition(
    &self,
    id: &DocumentId,
    action: Action,
    transition: ReferenceTransition,
  ) -> Result<AchievementReference> {
    let from = transition.from;
    let to = transition.to;
    match self
      .deadline
      .run("reference transition", self.references.transition(id.clone(), transition))
      .await
    {
      Ok(Some(reference)) => {
        info!(document_id = %id, %from, %to, "achievement transitioned");
        Ok(reference)
      }
      Ok(None) => Err(self.lost_race(id, action).await),
      Err(e) => {
        warn!(
          document_id = %id, %action, error = %e,
          "document written but reference transition failed; stores diverge until retried"
        );
        Err(e)
      }
    }
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  pub async fn create(
    &self,
    principal: &Principal,
    payload: Map<String, Value>,
  ) -> Result<MergedAchievement> {
    let student_id = async {
      self.authz.require(principal, Action::Create).await?;
      let student_id = self.ownership.student_for(principal.user_id).await?;
      Ok::<_, Error>(student_id)
    }
    .await
    .inspect_err(|e| debug!(action = %Action::Create, error = %e, "guard rejected request"))?;
    let content = fence::new_achievement(payload)?;

    let document = self
      .deadline
      .run("document insert", self.documents.insert(student_id, content))
      .await?;
    let reference = self
      .deadline
      .run("reference insert", self.references.insert(student_id, document.id.clone()))
      .await
      .inspect_err(|e| {
        warn!(
          document_id = %document.id, error = %e,
          "reference insert failed; document left orphaned"
        );
      })?;

    info!(document_id = %document.id, %student_id, "achievement created");
    Ok(MergedAchievement::merge(&reference, &document))
  }

  pub async fn update(
    &self,
    principal: &Principal,
    id: &DocumentId,
    payload: Map<String, Value>,
  ) -> Result<MergedAchievement> {
    let Admitted { reference, .. } = self.admit(principal, id, Action::Update).await?;
    let patch = fence::patch(payload)?;

    let updated = self
      .deadline
      .run("document update", self.documents.update_content(id.clone(), patch))
      .await?;
    if !updated {
      return Err(Error::NotFound(format!("achievement {id}")));
    }
    let document = self.document(id).await?;
    info!(document_id = %id, "achievement content updated");
    Ok(MergedAchievement::merge(&reference, &document))
  }

  pub async fn delete(&self, principal: &Principal, id: &DocumentId) -> Result<()> {
    self.admit(principal, id, Action::Delete).await?;

    let deleted = self
      .deadline
      .run("document delete", self.documents.soft_delete(id.clone()))
      .await?;
    if !deleted {
      return Err(Error::NotFound(format!("achievement {id}")));
    }
    // Once the document is gone every read reports the record as absent,
    // so a retry cannot reach the reference step again.
    self
      .commit_transition(id, Action::Delete, ReferenceTransition::delete(Utc::now()))
      .await?;
    Ok(())
  }

  pub async fn submit(&self, principal: &Principal, id: &DocumentId) -> Result<MergedAchievement> {
    self.admit(principal, id, Action::Submit).await?;

    let touched = self
      .deadline
      .run("document touch", self.documents.touch(id.clone()))
      .await?;
    if !touched {
      return Err(Error::NotFound(format!("achievement {id}")));
    }
    let reference = self
      .commit_transition(id, Action::Submit, ReferenceTransition::submit(Utc::now()))
      .await
      .map_err(Error::into_retriable)?;
    let document = self.document(id).await?;
    Ok(MergedAchievement::merge(&reference, &document))
  }

  pub async fn verify(
    &self,
    principal: &Principal,
    id: &DocumentId,
    points: i64,
  ) -> Result<MergedAchievement> {
    self.admit(principal, id, Action::Verify).await?;
    if points <= 0 {
      return Err(Error::Validation("points must be greater than zero".into()));
    }
    let review = Review::Verified { points, by: principal.user_id, at: Utc::now() };
    self.review(id, Action::Verify, review).await
  }

  pub async fn reject(
    &self,
    principal: &Principal,
    id: &DocumentId,
    note: &str,
  ) -> Result<MergedAchievement> {
    self.admit(principal, id, Action::Reject).await?;
    let note = note.trim();
    if note.is_empty() {
      return Err(Error::Validation("rejection note is required".into()));
    }
    let review = Review::Rejected { note: note.to_owned(), by: principal.user_id, at: Utc::now() };
    self.review(id, Action::Reject, review).await
  }

  async fn review(&self, id: &DocumentId, action: Action, review: Review) -> Result<MergedAchievement> {
    let transition = ReferenceTransition::review(&review);
    let recorded = self
      .deadline
      .run("document review", self.documents.record_review(id.clone(), review.clone()))
      .await?;
    if !recorded {
      // Either the document is gone or a competing review already committed.
      self.document(id).await?;
      return Err(self.lost_race(id, action).await);
    }
    let reference = self
      .commit_transition(id, action, transition)
      .await
      .map_err(Error::into_retriable)?;

    // Only the committed review may stay on the document: a concurrent loser
    // can have overwritten the fields between our two writes.
    let finalized = self
      .deadline
      .run("document review finalize", self.documents.finalize_review(id.clone(), review))
      .await
      .inspect_err(|e| {
        warn!(
          document_id = %id, %action, error = %e,
          "reference committed but review not finalised; document may hold a competing review"
        );
      })?;
    if !finalized {
      return Err(Error::NotFound(format!("achievement {id}")));
    }
    let document = self.document(id).await?;
    Ok(MergedAchievement::merge(&reference, &document))
  }

  /// Store `upload` through `sink` and append it to the document. Allowed in
  /// every live status; the reference is not touched.
  pub async fn attach<B: BlobSink>(
    &self,
    principal: &Principal,
    id: &DocumentId,
    upload: Upload,
    sink: &B,
  ) -> Result<Attachment> {
    self.admit(principal, id, Action::Attach).await?;
    if upload.bytes.is_empty() {
      return Err(Error::Validation("no file uploaded".into()));
    }
    if upload.file_name.trim().is_empty() {
      return Err(Error::Validation("file name is required".into()));
    }

    let file_url = self
      .deadline
      .run("blob write", sink.put(id.clone(), upload.file_name.clone(), upload.bytes))
      .await?;
    let attachment = Attachment {
      file_name: upload.file_name,
      file_url,
      file_type: upload.content_type,
      uploaded_at: Some(Utc::now()),
    };
    let pushed = self
      .deadline
      .run("attachment append", self.documents.push_attachment(id.clone(), attachment.clone()))
      .await?;
    if !pushed {
      return Err(Error::NotFound(format!("achievement {id}")));
    }
    info!(document_id = %id, file = %attachment.file_name, "attachment uploaded");
    Ok(attachment)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get(&self, principal: &Principal, id: &DocumentId) -> Result<MergedAchievement> {
    let Admitted { reference, document } = self.admit(principal, id, Action::Read).await?;
    Ok(MergedAchievement::merge(&reference, &document))
  }

  pub async fn history(&self, principal: &Principal, id: &DocumentId) -> Result<History> {
    let Admitted { reference, document } = self.admit(principal, id, Action::Read).await?;
    Ok(History::build(&reference, &document))
  }

  /// The caller's own live achievements, newest first. Documents without a
  /// reference (orphans from a failed create) are left out.
  pub async fn list_own(
    &self,
    principal: &Principal,
    achievement_type: Option<String>,
  ) -> Result<Vec<MergedAchievement>> {
    self.authz.require(principal, Action::Read).await?;
    let student_id = self.ownership.student_for(principal.user_id).await?;

    let documents = self
      .deadline
      .run("document list", self.documents.list_by_student(student_id, achievement_type))
      .await?;
    let references: HashMap<DocumentId, AchievementReference> = self
      .deadline
      .run("reference list", self.references.list_by_students(vec![student_id], None))
      .await?
      .into_iter()
      .map(|r| (r.document_id.clone(), r))
      .collect();

    Ok(
      documents
        .iter()
        .filter_map(|doc| {
          references
            .get(&doc.id)
            .filter(|r| r.status.is_live())
            .map(|r| MergedAchievement::merge(r, doc))
        })
        .collect(),
    )
  }

  /// Live achievements of every student currently assigned to the calling
  /// lecturer, optionally restricted to one status.
  pub async fn list_advisees(
    &self,
    principal: &Principal,
    status: Option<Status>,
  ) -> Result<Vec<MergedAchievement>> {
    self.authz.require(principal, Action::ViewAdvisees).await?;
    let students = self.ownership.advisees_of(principal.user_id).await?;
    self.merged_for(students, status).await
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  /// Counts over the records the caller may see: every record for an
  /// administrator, advisees' records for a lecturer, and a student's own
  /// records otherwise.
  pub async fn statistics(&self, principal: &Principal) -> Result<ScopedStatistics> {
    self.authz.require(principal, Action::ViewStatistics).await?;

    let (scope, records) = if self.authz.is_administrator(principal).await? {
      let references = self
        .deadline
        .run("reference list", self.references.list_all(None))
        .await?;
      (Scope::All, self.merge_live(&references).await?)
    } else if self.ownership.lecturer_profile(principal.user_id).await?.is_some() {
      let students = self.ownership.advisees_of(principal.user_id).await?;
      (Scope::Advisees, self.merged_for(students, None).await?)
    } else if let Some(student_id) = self.ownership.student_profile(principal.user_id).await? {
      (Scope::Own, self.merged_for(vec![student_id], None).await?)
    } else {
      return Err(Error::Forbidden("caller has no student or lecturer profile".into()));
    };

    debug!(user_id = %principal.user_id, ?scope, records = records.len(), "statistics computed");
    Ok(ScopedStatistics { scope, statistics: Statistics::tally(&records) })
  }

  /// One student's live records and their counts. Readable by the student,
  /// their current advisor, and administrators.
  pub async fn student_report(&self, principal: &Principal, student_id: Uuid) -> Result<StudentReport> {
    self.authz.require(principal, Action::ViewReport).await?;
    if !self.may_read(principal, student_id).await? {
      debug!(user_id = %principal.user_id, %student_id, "student report refused");
      return Err(Error::Forbidden("no access to this student's report".into()));
    }
    let records = self.merged_for(vec![student_id], None).await?;
    Ok(StudentReport::build(student_id, records))
  }

  // ── Read helpers ──────────────────────────────────────────────────────────

  async fn merged_for(
    &self,
    students: Vec<Uuid>,
    status: Option<Status>,
  ) -> Result<Vec<MergedAchievement>> {
    if students.is_empty() {
      return Ok(Vec::new());
    }
    let references = self
      .deadline
      .run("reference list", self.references.list_by_students(students, status))
      .await?;
    self.merge_live(&references).await
  }

  /// Join each live reference with its document. References whose document
  /// is gone are skipped.
  async fn merge_live(&self, references: &[AchievementReference]) -> Result<Vec<MergedAchievement>> {
    let mut merged = Vec::with_capacity(references.len());
    for reference in references.iter().filter(|r| r.status.is_live()) {
      let document = self
        .deadline
        .run("document read", self.documents.get(reference.document_id.clone()))
        .await?;
      if let Some(document) = document {
        merged.push(MergedAchievement::merge(reference, &document));
      }
    }
    Ok(merged)
  }
}
