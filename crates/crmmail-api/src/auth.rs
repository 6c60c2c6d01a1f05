//! HTTP Basic-auth extractor resolving the calling [`User`].
//!
//! Every lead endpoint takes a [`Caller`]; a request without valid
//! credentials is rejected with 401 before the handler body runs.

use std::collections::BTreeSet;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use crmmail_core::{
  security::{RoleId, User, UserId},
  store::LeadStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// A user account allowed to sign in.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
  pub id:            UserId,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  #[serde(default)]
  pub roles:         BTreeSet<RoleId>,
}

impl UserAccount {
  pub fn to_user(&self) -> User {
    User {
      id:       self.id,
      username: self.username.clone(),
      roles:    self.roles.clone(),
    }
  }
}

/// The accounts accepted by this server instance.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
  pub users: Vec<UserAccount>,
}

/// The authenticated actor for the current request.
pub struct Caller(pub User);

/// Verify Basic credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<User, ApiError> {
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

  let account = config
    .users
    .iter()
    .find(|u| u.username == username)
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&account.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(account.to_user())
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: LeadStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let user = verify_auth(&parts.headers, &state.auth).inspect_err(|_| {
      tracing::debug!(uri = %parts.uri, "rejected unauthenticated request");
    })?;
    Ok(Caller(user))
  }
}
