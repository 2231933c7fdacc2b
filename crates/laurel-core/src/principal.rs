//! Principal: the authenticated caller, as resolved by the transport layer.
//!
//! Credential verification happens outside the core; by the time a request
//! reaches the coordinator it carries a user id and exactly one role.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub user_id:     Uuid,
  pub role_id:     Uuid,
  /// Permissions pre-resolved for this request (e.g. carried on a session).
  /// When present and containing the requested permission, the relational
  /// lookup is skipped.
  #[serde(default)]
  pub permissions: Option<BTreeSet<String>>,
}

impl Principal {
  pub fn new(user_id: Uuid, role_id: Uuid) -> Self {
    Self { user_id, role_id, permissions: None }
  }

  pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.permissions = Some(permissions.into_iter().map(Into::into).collect());
    self
  }

  /// `true` only when a pre-resolved set exists and contains `permission`.
  pub fn carries(&self, permission: &str) -> bool {
    self
      .permissions
      .as_ref()
      .is_some_and(|set| set.contains(permission))
  }
}
