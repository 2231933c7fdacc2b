//! HTTP Basic-auth extractor and standalone verifier.
//!
//! Each configured account maps a username and an argon2 password hash to
//! the [`Principal`] the coordinator sees.

use std::collections::HashMap;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use laurel_core::principal::Principal;

use crate::{AppState, error::ApiError};

#[derive(Clone)]
pub struct Account {
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub principal:     Principal,
}

/// Credentials accepted as valid for this server instance.
#[derive(Clone, Default)]
pub struct AuthConfig {
  accounts: HashMap<String, Account>,
}

impl AuthConfig {
  pub fn new() -> Self { Self::default() }

  pub fn insert(
    &mut self,
    username: impl Into<String>,
    password_hash: impl Into<String>,
    principal: Principal,
  ) {
    self.accounts.insert(
      username.into(),
      Account { password_hash: password_hash.into(), principal },
    );
  }

  pub fn get(&self, username: &str) -> Option<&Account> { self.accounts.get(username) }

  pub fn len(&self) -> usize { self.accounts.len() }

  pub fn is_empty(&self) -> bool { self.accounts.is_empty() }
}

/// The authenticated caller. Present in a handler means the request carried
/// valid credentials.
pub struct Authenticated(pub Principal);

/// Verify credentials directly from headers and resolve the caller.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Principal, ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  let account = config.get(username).ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&account.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(account.principal.clone())
}

impl<D, R> FromRequestParts<AppState<D, R>> for Authenticated
where
  D: Send + Sync,
  R: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<D, R>,
  ) -> Result<Self, Self::Rejection> {
    let principal = verify_auth(&parts.headers, &state.auth)?;
    Ok(Authenticated(principal))
  }
}
