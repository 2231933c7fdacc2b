//! Account provisioning: turns the `[[accounts]]` config entries into an
//! [`AuthConfig`] and makes sure every account has the directory profile it
//! claims.

use std::collections::{BTreeSet, HashMap};

use laurel_core::principal::Principal;
use laurel_store_sqlite::SqliteReferenceStore;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthConfig;

/// Directory profile attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
  Student,
  Lecturer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
  pub username:      String,
  pub password_hash: String,
  pub user_id:       Uuid,
  /// Role name, resolved against the relational store at startup.
  pub role:          String,
  #[serde(default)]
  pub profile:       Option<ProfileKind>,
  /// Username of the lecturer account advising this student.
  #[serde(default)]
  pub advisor:       Option<String>,
  /// Pre-resolved permissions carried on every request of this account.
  #[serde(default)]
  pub permissions:   Option<BTreeSet<String>>,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
  #[error("account {account}: unknown role {role:?}")]
  UnknownRole { account: String, role: String },

  #[error("account {0}: advisor is set but the account has no student profile")]
  NotAStudent(String),

  #[error("account {account}: advisor {advisor:?} is not a lecturer account")]
  UnknownAdvisor { account: String, advisor: String },

  #[error("duplicate account {0}")]
  Duplicate(String),

  #[error(transparent)]
  Store(#[from] laurel_store_sqlite::Error),
}

/// Resolve roles, create missing profiles, assign advisors, and build the
/// credential table.
pub async fn provision(
  references: &SqliteReferenceStore,
  accounts: &[AccountConfig],
) -> Result<AuthConfig, ProvisionError> {
  let mut auth = AuthConfig::new();
  let mut students = HashMap::new();
  let mut lecturers = HashMap::new();

  for account in accounts {
    if auth.get(&account.username).is_some() {
      return Err(ProvisionError::Duplicate(account.username.clone()));
    }
    let role_id = references
      .role_id(&account.role)
      .await?
      .ok_or_else(|| ProvisionError::UnknownRole {
        account: account.username.clone(),
        role:    account.role.clone(),
      })?;

    match account.profile {
      Some(ProfileKind::Student) => {
        let id = references.ensure_student(account.user_id).await?;
        students.insert(account.username.as_str(), id);
      }
      Some(ProfileKind::Lecturer) => {
        let id = references.ensure_lecturer(account.user_id).await?;
        lecturers.insert(account.username.as_str(), id);
      }
      None => {}
    }

    let mut principal = Principal::new(account.user_id, role_id);
    principal.permissions = account.permissions.clone();
    auth.insert(&account.username, &account.password_hash, principal);
  }

  for account in accounts {
    let Some(advisor) = &account.advisor else { continue };
    let student = *students
      .get(account.username.as_str())
      .ok_or_else(|| ProvisionError::NotAStudent(account.username.clone()))?;
    let lecturer = *lecturers
      .get(advisor.as_str())
      .ok_or_else(|| ProvisionError::UnknownAdvisor {
        account: account.username.clone(),
        advisor: advisor.clone(),
      })?;
    references.set_advisor(student, Some(lecturer)).await?;
    tracing::info!(student = %account.username, advisor = %advisor, "advisor assigned");
  }

  tracing::info!(accounts = auth.len(), "accounts provisioned");
  Ok(auth)
}
