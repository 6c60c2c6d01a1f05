//! Error type for `crmmail-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] crmmail_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to attach an event to a lead that does not exist.
  #[error("lead not found: {0}")]
  LeadNotFound(crmmail_core::lead::LeadId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
