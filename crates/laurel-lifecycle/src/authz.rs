//! Role-based authorization.
//!
//! Answers "may this role ever do X". Whether the caller may do X to a
//! particular record is the ownership resolver's question; both must pass.

use std::sync::Arc;

use laurel_core::{
  Action, Error, Result, principal::Principal, store::PermissionStore,
};
use tracing::debug;

use crate::Deadline;

pub struct AuthorizationResolver<P> {
  permissions: Arc<P>,
  deadline:    Deadline,
  admin_role:  String,
}

impl<P: PermissionStore> AuthorizationResolver<P> {
  pub fn new(permissions: Arc<P>, deadline: Deadline, admin_role: impl Into<String>) -> Self {
    Self { permissions, deadline, admin_role: admin_role.into() }
  }

  /// Checks the principal's pre-resolved set first and falls back to the
  /// role → permission table.
  pub async fn has_permission(&self, principal: &Principal, permission: &str) -> Result<bool> {
    if principal.carries(permission) {
      return Ok(true);
    }
    self
      .deadline
      .run(
        "permission lookup",
        self.permissions.role_has_permission(principal.role_id, permission.to_owned()),
      )
      .await
  }

  pub async fn require(&self, principal: &Principal, action: Action) -> Result<()> {
    let permission = action.permission();
    if self.has_permission(principal, permission).await? {
      Ok(())
    } else {
      debug!(user_id = %principal.user_id, %permission, "permission denied");
      Err(Error::Forbidden(format!("missing permission {permission}")))
    }
  }

  pub async fn is_administrator(&self, principal: &Principal) -> Result<bool> {
    let name = self
      .deadline
      .run("role lookup", self.permissions.role_name(principal.role_id))
      .await?;
    Ok(name.as_deref() == Some(self.admin_role.as_str()))
  }
}
