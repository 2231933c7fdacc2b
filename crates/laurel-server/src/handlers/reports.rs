//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports/statistics` | Scoped by caller: all, advisees, or own |
//! | `GET`  | `/reports/students/{id}` | Student, assigned advisor, or administrator |

use axum::{
  Json,
  extract::{Path, State},
};
use laurel_core::{
  Error,
  report::{ScopedStatistics, StudentReport},
  store::{Directory, DocumentStore, PermissionStore, ReferenceStore},
};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `GET /reports/statistics`
pub async fn statistics<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<ScopedStatistics>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  Ok(Json(state.coordinator.statistics(&principal).await?))
}

/// `GET /reports/students/{id}`
pub async fn student<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
) -> Result<Json<StudentReport>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let student_id =
    Uuid::parse_str(&id).map_err(|_| Error::NotFound(format!("student {id}")))?;
  Ok(Json(state.coordinator.student_report(&principal, student_id).await?))
}
