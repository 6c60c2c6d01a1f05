//! HTTP server wiring for crmmail.
//!
//! Deserialises [`ServerConfig`] and mounts the lead API under its prefix.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use crmmail_api::{AppState, AuthConfig, UserAccount};
use crmmail_core::store::LeadStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_api_prefix() -> String { "/api/v1/leads".to_string() }

/// Runtime server configuration, deserialised from `config.toml` and
/// `CRMMAIL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default = "default_api_prefix")]
  pub api_prefix: String,
  #[serde(default)]
  pub users:      Vec<UserAccount>,
}

impl ServerConfig {
  pub fn auth(&self) -> AuthConfig {
    AuthConfig { users: self.users.clone() }
  }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// Build the full application: the lead API nested under
/// `config.api_prefix`, with request tracing.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: LeadStore + 'static,
{
  let state = AppState::new(store, config.auth());
  Router::new()
    .nest(&config.api_prefix, crmmail_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
