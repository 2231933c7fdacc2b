//! `GET /achievements/{id}/history`: merged record plus derived timeline.

use axum::{
  Json,
  extract::{Path, State},
};
use laurel_core::{
  store::{Directory, DocumentStore, PermissionStore, ReferenceStore},
  view::History,
};

use crate::{AppState, auth::Authenticated, error::ApiError, handlers::document_id};

pub async fn handler<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
) -> Result<Json<History>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let id = document_id(&id)?;
  Ok(Json(state.coordinator.history(&principal, &id).await?))
}
