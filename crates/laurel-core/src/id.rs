//! Opaque document identifiers.
//!
//! A document id is 12 bytes rendered as 24 lowercase hex characters: a
//! 4-byte big-endian seconds timestamp followed by 8 random bytes. Ids are
//! assigned by the document store at creation and never change.

use std::{fmt, str::FromStr};

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::Error;

const RAW_LEN: usize = 12;
const HEX_LEN: usize = RAW_LEN * 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
  /// Generate a fresh id for a new document.
  pub fn generate() -> Self {
    let mut raw = [0u8; RAW_LEN];
    let secs = Utc::now().timestamp() as u32;
    raw[..4].copy_from_slice(&secs.to_be_bytes());
    OsRng.fill_bytes(&mut raw[4..]);
    Self(hex::encode(raw))
  }

  /// Parse a caller-supplied id. Anything other than 24 hex characters is
  /// reported as [`Error::NotFound`] so that malformed and unknown ids are
  /// indistinguishable to callers.
  pub fn parse(s: &str) -> Result<Self, Error> {
    if s.len() != HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
      return Err(Error::NotFound(format!("malformed achievement id {s:?}")));
    }
    Ok(Self(s.to_ascii_lowercase()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for DocumentId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for DocumentId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(&s) }
}

impl From<DocumentId> for String {
  fn from(id: DocumentId) -> Self { id.0 }
}
