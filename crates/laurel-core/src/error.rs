//! Error taxonomy shared by every layer of the service.

use thiserror::Error;

use crate::lifecycle::{Action, Status};

#[derive(Debug, Error)]
pub enum Error {
  /// The reference or document is absent, soft-deleted, or the identifier is
  /// malformed.
  #[error("not found: {0}")]
  NotFound(String),

  /// A permission, ownership, or advisor check failed.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("cannot {action} an achievement in status {from}")]
  InvalidTransition { from: Status, action: Action },

  #[error("validation failed: {0}")]
  Validation(String),

  /// The record already progressed past the requested step.
  #[error("conflict: {0}")]
  Conflict(String),

  /// A store call failed or exceeded its deadline. `retriable` is set when
  /// the failure hit the second write of a two-write operation whose first
  /// write may be repeated.
  #[error("store failure during {stage}: {source}")]
  StoreFailure {
    stage:     &'static str,
    retriable: bool,
    #[source]
    source:    Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  pub fn store<E>(stage: &'static str, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreFailure { stage, retriable: false, source: Box::new(source) }
  }

  /// Mark a store failure as safe to retry; other variants pass through.
  pub fn into_retriable(self) -> Self {
    match self {
      Self::StoreFailure { stage, source, .. } => {
        Self::StoreFailure { stage, retriable: true, source }
      }
      other => other,
    }
  }

  pub fn is_retriable(&self) -> bool {
    matches!(self, Self::StoreFailure { retriable: true, .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
