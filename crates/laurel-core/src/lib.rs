//! Core types and trait definitions for the Laurel achievement service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Every other crate depends on it: the lifecycle coordinator drives the
//! traits in [`store`], and the storage backends implement them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod achievement;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod principal;
pub mod reference;
pub mod report;
pub mod store;
pub mod view;

pub use error::{Error, Result};
pub use id::DocumentId;
pub use lifecycle::{Action, Status};
