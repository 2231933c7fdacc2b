//! Collaborator traits driven by the lifecycle coordinator.
//!
//! Storage backends (e.g. `laurel-store-sqlite`) implement these. The
//! document store and the reference store are separate handles with no
//! shared transaction; the coordinator owns the protocol that keeps them
//! consistent.
//!
//! All methods return `Send` futures so implementations can be driven from
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  DocumentId, Status,
  achievement::{Achievement, AchievementPatch, Attachment, NewAchievement, Review},
  reference::{AchievementReference, ReferenceTransition},
};

// ─── Document store ──────────────────────────────────────────────────────────

/// Schema-flexible store holding achievement content.
///
/// Write methods return `false` when no live (non-deleted) document matched.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new document for `student_id`. The store assigns the id and
  /// timestamps, forces `points` to zero, and starts with no attachments.
  fn insert(
    &self,
    student_id: Uuid,
    content: NewAchievement,
  ) -> impl Future<Output = Result<Achievement, Self::Error>> + Send + '_;

  /// Retrieve a live document. Soft-deleted documents are reported as `None`.
  fn get(
    &self,
    id: DocumentId,
  ) -> impl Future<Output = Result<Option<Achievement>, Self::Error>> + Send + '_;

  /// All live documents of a student, newest first, optionally restricted to
  /// one achievement type.
  fn list_by_student(
    &self,
    student_id: Uuid,
    achievement_type: Option<String>,
  ) -> impl Future<Output = Result<Vec<Achievement>, Self::Error>> + Send + '_;

  /// Merge the present fields of `patch` into the document and bump
  /// `updatedAt`.
  fn update_content(
    &self,
    id: DocumentId,
    patch: AchievementPatch,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Bump `updatedAt` only.
  fn touch(
    &self,
    id: DocumentId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record the document-side half of a verify/reject decision, replacing
  /// any earlier review that was never finalised. Returns `false` once the
  /// review is final.
  fn record_review(
    &self,
    id: DocumentId,
    review: Review,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Write `review` and mark it final, after the reference has committed the
  /// matching transition. Overrides any review recorded in between.
  fn finalize_review(
    &self,
    id: DocumentId,
    review: Review,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Append an attachment, preserving the order of earlier ones.
  fn push_attachment(
    &self,
    id: DocumentId,
    attachment: Attachment,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Mark the document deleted. The row is kept for audit history.
  fn soft_delete(
    &self,
    id: DocumentId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Reference store ─────────────────────────────────────────────────────────

/// Relational store holding the workflow reference row of each document.
pub trait ReferenceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the reference for a freshly written document, in `draft`.
  fn insert(
    &self,
    student_id: Uuid,
    document_id: DocumentId,
  ) -> impl Future<Output = Result<AchievementReference, Self::Error>> + Send + '_;

  /// Every reference, newest first, optionally restricted to one status.
  fn list_all(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<AchievementReference>, Self::Error>>
  + Send
  + '_;

  fn get_by_document(
    &self,
    document_id: DocumentId,
  ) -> impl Future<Output = Result<Option<AchievementReference>, Self::Error>>
  + Send
  + '_;

  /// References of the given students, newest first, optionally restricted
  /// to one status.
  fn list_by_students(
    &self,
    student_ids: Vec<Uuid>,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<AchievementReference>, Self::Error>>
  + Send
  + '_;

  /// Apply `transition` atomically if and only if the row's status still
  /// equals `transition.from`. Returns the updated row, or `None` when the
  /// precondition no longer held (or the row is gone).
  fn transition(
    &self,
    document_id: DocumentId,
    transition: ReferenceTransition,
  ) -> impl Future<Output = Result<Option<AchievementReference>, Self::Error>>
  + Send
  + '_;
}

// ─── Student directory ───────────────────────────────────────────────────────

/// Read-only view of student and lecturer profiles and the advisor
/// relationship. Owned by an external directory service.
pub trait Directory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The student profile id belonging to a user, if any.
  fn student_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  /// The lecturer profile id belonging to a user, if any.
  fn lecturer_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  /// The student's current advisor (a lecturer profile id).
  fn advisor_of(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  /// Students currently assigned to a lecturer.
  fn advisees_of(
    &self,
    lecturer_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;
}

// ─── RBAC ────────────────────────────────────────────────────────────────────

/// Read-only role → permission mapping. Owned by an external RBAC
/// administration service.
pub trait PermissionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn role_has_permission(
    &self,
    role_id: Uuid,
    permission: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn role_name(
    &self,
    role_id: Uuid,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;
}

// ─── Blob storage ────────────────────────────────────────────────────────────

/// Where uploaded attachment bytes go. Returns the URL the attachment is
/// served from.
pub trait BlobSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn put(
    &self,
    document_id: DocumentId,
    file_name: String,
    bytes: Vec<u8>,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}
