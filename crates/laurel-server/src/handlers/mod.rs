//! JSON handlers mounted under `/api/v1`.

pub mod achievements;
pub mod attachments;
pub mod history;
pub mod reports;
pub mod transitions;

use laurel_core::DocumentId;

use crate::error::ApiError;

/// Parse a path id. Malformed ids are reported as not found.
pub(crate) fn document_id(raw: &str) -> Result<DocumentId, ApiError> {
  Ok(DocumentId::parse(raw)?)
}
