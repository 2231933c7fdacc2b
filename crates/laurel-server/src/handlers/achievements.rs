//! Handlers for `/achievements` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/achievements` | Caller's own records; optional `?type=` |
//! | `POST`   | `/achievements` | Body: content fields; returns 201 + merged record |
//! | `GET`    | `/achievements/advisees` | Lecturer view; optional `?status=` |
//! | `GET`    | `/achievements/{id}` | Owner, assigned advisor, or administrator |
//! | `PATCH`  | `/achievements/{id}` | Draft only; body: content fields |
//! | `DELETE` | `/achievements/{id}` | Draft only; soft delete |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use laurel_core::{
  Status,
  store::{Directory, DocumentStore, PermissionStore, ReferenceStore},
  view::MergedAchievement,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{AppState, auth::Authenticated, error::ApiError, handlers::document_id};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(rename = "type")]
  pub achievement_type: Option<String>,
}

/// `GET /achievements[?type=<achievement type>]`
pub async fn list_own<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<MergedAchievement>>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let records = state
    .coordinator
    .list_own(&principal, params.achievement_type)
    .await?;
  Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct AdviseeParams {
  pub status: Option<Status>,
}

/// `GET /achievements/advisees[?status=<status>]`
pub async fn list_advisees<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Query(params): Query<AdviseeParams>,
) -> Result<Json<Vec<MergedAchievement>>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let records = state
    .coordinator
    .list_advisees(&principal, params.status)
    .await?;
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /achievements`: returns 201 + the merged draft.
///
/// The body is passed through as a raw JSON object so the field policy can
/// see (and refuse) fields no typed body would admit.
pub async fn create<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let record = state.coordinator.create(&principal, body).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /achievements/{id}`
pub async fn get_one<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
) -> Result<Json<MergedAchievement>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let id = document_id(&id)?;
  Ok(Json(state.coordinator.get(&principal, &id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /achievements/{id}`
pub async fn update<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
  Json(body): Json<Map<String, Value>>,
) -> Result<Json<MergedAchievement>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let id = document_id(&id)?;
  Ok(Json(state.coordinator.update(&principal, &id, body).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /achievements/{id}`
pub async fn delete<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let id = document_id(&id)?;
  state.coordinator.delete(&principal, &id).await?;
  Ok(Json(json!({ "id": id, "status": Status::Deleted })))
}
