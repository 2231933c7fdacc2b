//! Workflow transitions: submit, verify, reject.
//!
//! Each returns the merged record after the reference moved. A failure
//! between the document write and the reference write comes back as a 500
//! whose body carries `"retriable": true`; repeating the same request is
//! safe in that case.

use axum::{
  Json,
  extract::{Path, State},
};
use laurel_core::{
  store::{Directory, DocumentStore, PermissionStore, ReferenceStore},
  view::MergedAchievement,
};
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::ApiError, handlers::document_id};

/// `POST /achievements/{id}/submit`
pub async fn submit<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
) -> Result<Json<MergedAchievement>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let id = document_id(&id)?;
  Ok(Json(state.coordinator.submit(&principal, &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  /// Missing points read as zero and fail validation.
  #[serde(default)]
  pub points: i64,
}

/// `POST /achievements/{id}/verify`: body: `{"points": 10}`
pub async fn verify<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
  Json(body): Json<VerifyBody>,
) -> Result<Json<MergedAchievement>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let id = document_id(&id)?;
  Ok(Json(state.coordinator.verify(&principal, &id, body.points).await?))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  #[serde(default, alias = "rejectionNote")]
  pub note: String,
}

/// `POST /achievements/{id}/reject`: body: `{"note": "..."}`
pub async fn reject<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
  Json(body): Json<RejectBody>,
) -> Result<Json<MergedAchievement>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let id = document_id(&id)?;
  Ok(Json(state.coordinator.reject(&principal, &id, &body.note).await?))
}
