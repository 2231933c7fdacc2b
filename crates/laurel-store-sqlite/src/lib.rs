//! SQLite backends for the Laurel achievement service.
//!
//! The document store and the reference store live on separate
//! [`tokio_rusqlite`] connections (normally separate files), so no
//! transaction ever spans both. The relational side also hosts the student
//! directory and the role → permission tables.

mod catalogue;
mod document;
mod encode;
mod relational;
mod schema;

pub mod error;

pub use catalogue::{DEFAULT_ROLES, PERMISSIONS};
pub use document::SqliteDocumentStore;
pub use error::{Error, Result};
pub use relational::SqliteReferenceStore;
