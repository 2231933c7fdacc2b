//! The achievement state machine.
//!
//! A reference moves along `draft → submitted → {verified | rejected}`, with
//! `deleted` reachable only from `draft`. No transition returns to an earlier
//! state. The table lives in [`Status::apply`]; everything else in the
//! service asks it before writing.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::Error;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Workflow status of an achievement, owned by the reference row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
  Draft,
  Submitted,
  Verified,
  Rejected,
  /// Soft-deleted draft. Treated as absent by every read and write path.
  Deleted,
}

// ─── Action ──────────────────────────────────────────────────────────────────

/// Everything a caller can ask the coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  Create,
  Update,
  Delete,
  Submit,
  Verify,
  Reject,
  Attach,
  Read,
  #[strum(serialize = "list advisee achievements of")]
  ViewAdvisees,
  #[strum(serialize = "view statistics of")]
  ViewStatistics,
  #[strum(serialize = "view the student report of")]
  ViewReport,
}

impl Action {
  /// The RBAC permission a role must hold to attempt this action.
  pub fn permission(self) -> &'static str {
    match self {
      Self::Create => "achievement:create",
      Self::Update | Self::Attach => "achievement:update",
      Self::Delete => "achievement:delete",
      Self::Submit => "achievement:submit",
      Self::Verify => "achievement:verify",
      Self::Reject => "achievement:reject",
      Self::Read => "achievement:read",
      Self::ViewAdvisees => "achievement:view-advisee",
      Self::ViewStatistics => "report:statistics",
      Self::ViewReport => "report:student",
    }
  }
}

// ─── Transition table ────────────────────────────────────────────────────────

impl Status {
  /// Resolve `action` against this status, returning the status the
  /// reference holds afterwards.
  ///
  /// Re-submitting a record that is already `submitted` or `verified` is a
  /// [`Error::Conflict`]; every other pair outside the table is an
  /// [`Error::InvalidTransition`].
  pub fn apply(self, action: Action) -> Result<Status, Error> {
    use Action as A;
    use Status as S;

    match (self, action) {
      (S::Draft, A::Update) => Ok(S::Draft),
      (S::Draft, A::Delete) => Ok(S::Deleted),
      (S::Draft, A::Submit) => Ok(S::Submitted),
      (S::Submitted | S::Verified, A::Submit) => Err(Error::Conflict(format!(
        "achievement is already {self}"
      ))),
      (S::Submitted, A::Verify) => Ok(S::Verified),
      (S::Submitted, A::Reject) => Ok(S::Rejected),
      (s, A::Attach | A::Read) if s != S::Deleted => Ok(s),
      (from, action) => Err(Error::InvalidTransition { from, action }),
    }
  }

  pub fn is_live(self) -> bool { self != Self::Deleted }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn happy_path_verify() {
    let s = Status::Draft.apply(Action::Submit).unwrap();
    assert_eq!(s, Status::Submitted);
    assert_eq!(s.apply(Action::Verify).unwrap(), Status::Verified);
  }

  #[test]
  fn happy_path_reject() {
    assert_eq!(Status::Submitted.apply(Action::Reject).unwrap(), Status::Rejected);
  }

  #[test]
  fn only_draft_can_be_deleted() {
    assert_eq!(Status::Draft.apply(Action::Delete).unwrap(), Status::Deleted);
    for s in [Status::Submitted, Status::Verified, Status::Rejected, Status::Deleted] {
      assert!(
        matches!(s.apply(Action::Delete), Err(Error::InvalidTransition { from, .. }) if from == s),
        "{s}"
      );
    }
  }

  #[test]
  fn only_draft_content_is_editable() {
    assert_eq!(Status::Draft.apply(Action::Update).unwrap(), Status::Draft);
    assert!(matches!(
      Status::Submitted.apply(Action::Update),
      Err(Error::InvalidTransition { .. })
    ));
  }

  #[test]
  fn resubmission_is_a_conflict() {
    assert!(matches!(Status::Submitted.apply(Action::Submit), Err(Error::Conflict(_))));
    assert!(matches!(Status::Verified.apply(Action::Submit), Err(Error::Conflict(_))));
  }

  #[test]
  fn rejected_is_terminal() {
    for a in [Action::Submit, Action::Update, Action::Delete, Action::Verify, Action::Reject] {
      assert!(
        matches!(Status::Rejected.apply(a), Err(Error::InvalidTransition { .. })),
        "{a}"
      );
    }
  }

  #[test]
  fn verify_requires_submitted() {
    for s in [Status::Draft, Status::Verified, Status::Rejected] {
      assert!(matches!(s.apply(Action::Verify), Err(Error::InvalidTransition { .. })));
    }
  }

  #[test]
  fn attachments_allowed_until_deleted() {
    for s in [Status::Draft, Status::Submitted, Status::Verified, Status::Rejected] {
      assert_eq!(s.apply(Action::Attach).unwrap(), s);
    }
    assert!(Status::Deleted.apply(Action::Attach).is_err());
  }

  #[test]
  fn status_text_roundtrip() {
    assert_eq!(Status::Submitted.as_ref(), "submitted");
    assert_eq!(Status::from_str("verified").unwrap(), Status::Verified);
    assert!(Status::from_str("archived").is_err());
  }

  #[test]
  fn invalid_transition_message_names_action() {
    let err = Status::Draft.apply(Action::Verify).unwrap_err();
    assert_eq!(err.to_string(), "cannot verify an achievement in status draft");
  }
}
