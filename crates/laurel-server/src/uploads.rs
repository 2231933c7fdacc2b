//! [`DiskBlobSink`]: attachment bytes on the local filesystem.
//!
//! Files land at `<root>/achievements/<document id>/<sha256><ext>` and are
//! served back by the router under `/static`. Naming by content hash means
//! re-uploading the same bytes reuses one file.

use std::path::{Path, PathBuf};

use laurel_core::{DocumentId, store::BlobSink};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct DiskBlobSink {
  root: PathBuf,
}

impl DiskBlobSink {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }
}

/// Stored name for an upload: the hex sha256 of its bytes plus the original
/// extension, lowercased.
fn stored_name(file_name: &str, bytes: &[u8]) -> String {
  let digest = hex::encode(Sha256::digest(bytes));
  match Path::new(file_name).extension().and_then(|e| e.to_str()) {
    Some(ext) if !ext.is_empty() => format!("{digest}.{}", ext.to_ascii_lowercase()),
    _ => digest,
  }
}

impl BlobSink for DiskBlobSink {
  type Error = std::io::Error;

  async fn put(
    &self,
    document_id: DocumentId,
    file_name: String,
    bytes: Vec<u8>,
  ) -> Result<String, Self::Error> {
    let name = stored_name(&file_name, &bytes);
    let dir = self.root.join("achievements").join(document_id.as_str());

    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(&name), &bytes).await?;

    tracing::debug!(%document_id, file = %file_name, stored = %name, "blob written");
    Ok(format!("/static/achievements/{document_id}/{name}"))
  }
}
