//! Error types for `crmmail-core`.

use thiserror::Error;

use crate::lead::LeadId;

#[derive(Debug, Error)]
pub enum Error {
  /// The lead does not exist, or exists but is not visible to the caller.
  /// The two cases are deliberately indistinguishable.
  #[error("lead not found: {0}")]
  LeadNotFound(LeadId),

  #[error("{0}")]
  InvalidField(String),

  #[error("unknown lead event type: {0:?}")]
  UnknownEventType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
