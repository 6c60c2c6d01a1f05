//! JSON REST API for crmmail leads.
//!
//! Exposes an axum [`Router`] backed by any [`crmmail_core::store::LeadStore`].
//! Every route authenticates the caller with HTTP Basic credentials; TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1/leads", crmmail_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod leads;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use crmmail_core::{service::LeadService, store::LeadStore};

pub use auth::{AuthConfig, Caller, UserAccount};
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: LeadStore> {
  pub leads: LeadService<S>,
  pub auth:  Arc<AuthConfig>,
}

impl<S: LeadStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      leads: self.leads.clone(),
      auth:  Arc::clone(&self.auth),
    }
  }
}

impl<S: LeadStore> AppState<S> {
  pub fn new(store: Arc<S>, auth: AuthConfig) -> Self {
    Self {
      leads: LeadService::new(store),
      auth:  Arc::new(auth),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised lead router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: LeadStore + 'static,
{
  Router::new()
    .route(
      "/",
      get(leads::list::<S>)
        .post(leads::create::<S>)
        .put(leads::update::<S>),
    )
    .route("/newWithEmail", post(leads::new_with_email::<S>))
    .route("/{id}", get(leads::get_one::<S>))
    .route("/{id}/addEmail", put(leads::add_email::<S>))
    .route("/{id}/addNote", put(leads::add_note::<S>))
    .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
  use argon2::{
    Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString,
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use crmmail_core::security::{RoleId, UserId};
  use rand_core::OsRng;

  use crate::UserAccount;

  /// Argon2id with minimal cost parameters; verification reads them back
  /// from the PHC string, so tests stay fast.
  pub fn hash(password: &str) -> String {
    let params = Params::new(8, 1, 1, None).unwrap();
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  pub fn account(id: i64, username: &str, password: &str, roles: &[i64]) -> UserAccount {
    UserAccount {
      id:            UserId(id),
      username:      username.to_string(),
      password_hash: hash(password),
      roles:         roles.iter().copied().map(RoleId).collect(),
    }
  }

  pub fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────
