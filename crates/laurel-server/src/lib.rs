//! HTTP surface for the Laurel achievement service.
//!
//! Exposes an axum [`Router`] over a [`Coordinator`] wired to one document
//! store and one relational store (which also serves as the student
//! directory and the permission table). Uploaded files are written to disk
//! and served back under `/static`.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod uploads;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use laurel_core::store::{Directory, DocumentStore, PermissionStore, ReferenceStore};
use laurel_lifecycle::{Coordinator, CoordinatorConfig};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use accounts::AccountConfig;
use auth::AuthConfig;
use handlers::{achievements, attachments, history, reports, transitions};
use uploads::DiskBlobSink;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub document_store_path:  PathBuf,
  pub reference_store_path: PathBuf,
  pub upload_dir:           PathBuf,
  #[serde(default = "default_store_timeout_ms")]
  pub store_timeout_ms:     u64,
  #[serde(default = "default_admin_role")]
  pub admin_role:           String,
  #[serde(default = "default_seed_roles")]
  pub seed_roles:           bool,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes:     usize,
  #[serde(default)]
  pub accounts:             Vec<AccountConfig>,
}

fn default_store_timeout_ms() -> u64 { 5_000 }

fn default_admin_role() -> String { "admin".to_string() }

fn default_seed_roles() -> bool { true }

fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }

impl ServerConfig {
  pub fn coordinator_config(&self) -> CoordinatorConfig {
    CoordinatorConfig {
      store_timeout: Duration::from_millis(self.store_timeout_ms),
      admin_role:    self.admin_role.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<D, R> {
  pub coordinator: Arc<Coordinator<D, R, R, R>>,
  pub auth:        Arc<AuthConfig>,
  pub uploads:     Arc<DiskBlobSink>,
  pub config:      Arc<ServerConfig>,
}

impl<D, R> Clone for AppState<D, R> {
  fn clone(&self) -> Self {
    Self {
      coordinator: self.coordinator.clone(),
      auth:        self.auth.clone(),
      uploads:     self.uploads.clone(),
      config:      self.config.clone(),
    }
  }
}

impl<D, R> AppState<D, R>
where
  D: DocumentStore,
  R: ReferenceStore + Directory + PermissionStore,
{
  pub fn new(documents: Arc<D>, references: Arc<R>, auth: AuthConfig, config: ServerConfig) -> Self {
    let coordinator = Coordinator::new(
      documents,
      references.clone(),
      references.clone(),
      references,
      config.coordinator_config(),
    );
    Self {
      coordinator: Arc::new(coordinator),
      auth:        Arc::new(auth),
      uploads:     Arc::new(DiskBlobSink::new(config.upload_dir.clone())),
      config:      Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`]: the JSON API under `/api/v1` and uploaded
/// files under `/static`.
pub fn router<D, R>(state: AppState<D, R>) -> Router
where
  D: DocumentStore + 'static,
  R: ReferenceStore + Directory + PermissionStore + 'static,
{
  let api = Router::new()
    .route(
      "/achievements",
      get(achievements::list_own::<D, R>).post(achievements::create::<D, R>),
    )
    .route("/achievements/advisees", get(achievements::list_advisees::<D, R>))
    .route(
      "/achievements/{id}",
      get(achievements::get_one::<D, R>)
        .patch(achievements::update::<D, R>)
        .delete(achievements::delete::<D, R>),
    )
    .route("/achievements/{id}/submit",      post(transitions::submit::<D, R>))
    .route("/achievements/{id}/verify",      post(transitions::verify::<D, R>))
    .route("/achievements/{id}/reject",      post(transitions::reject::<D, R>))
    .route("/achievements/{id}/attachments", post(attachments::upload::<D, R>))
    .route("/achievements/{id}/history",     get(history::handler::<D, R>))
    .route("/reports/statistics",            get(reports::statistics::<D, R>))
    .route("/reports/students/{id}",         get(reports::student::<D, R>));

  let static_files = ServeDir::new(state.uploads.root());
  let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

  Router::new()
    .nest("/api/v1", api)
    .nest_service("/static", static_files)
    .layer(body_limit)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
