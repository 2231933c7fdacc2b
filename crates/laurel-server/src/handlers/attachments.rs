//! `POST /achievements/{id}/attachments`: multipart upload, field `file`.

use axum::{
  Json,
  extract::{Multipart, Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use laurel_core::{
  achievement::Upload,
  store::{Directory, DocumentStore, PermissionStore, ReferenceStore},
};

use crate::{AppState, auth::Authenticated, error::ApiError, handlers::document_id};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Pull the `file` part out of the form. Other parts are ignored.
async fn read_upload(mut form: Multipart) -> Result<Option<Upload>, ApiError> {
  while let Some(field) = form
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    if field.name() != Some("file") {
      continue;
    }
    let file_name = field.file_name().unwrap_or_default().to_owned();
    let content_type = field.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_owned();
    let bytes = field
      .bytes()
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    return Ok(Some(Upload { file_name, content_type, bytes: bytes.to_vec() }));
  }
  Ok(None)
}

pub async fn upload<D, R>(
  State(state): State<AppState<D, R>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
  form: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let id = document_id(&id)?;
  // A form without a `file` part is an empty upload.
  let upload = read_upload(form).await?.unwrap_or(Upload {
    file_name:    String::new(),
    content_type: DEFAULT_CONTENT_TYPE.into(),
    bytes:        Vec::new(),
  });
  let attachment = state
    .coordinator
    .attach(&principal, &id, upload, state.uploads.as_ref())
    .await?;
  Ok((StatusCode::CREATED, Json(attachment)))
}
