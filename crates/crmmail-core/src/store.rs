//! The `LeadStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `crmmail-store-sqlite`).
//! It knows nothing about callers or visibility; that is the job of
//! [`crate::service::LeadService`].

use std::future::Future;

use crate::{
  event::{LeadEvent, NewLeadEvent},
  lead::{Lead, LeadId, NewLead},
};

/// Abstraction over a lead store backend.
///
/// Ids and creation timestamps are always assigned by the store. Events are
/// append-only and are only ever written through [`LeadStore::add_event`] or
/// [`LeadStore::create_lead_with_event`].
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait LeadStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new lead and return it with its assigned id.
  fn create_lead(
    &self,
    input: NewLead,
  ) -> impl Future<Output = Result<Lead, Self::Error>> + Send + '_;

  /// Persist a new lead and its first event in one transaction. Either both
  /// rows are written or neither is.
  fn create_lead_with_event(
    &self,
    lead: NewLead,
    event: NewLeadEvent,
  ) -> impl Future<Output = Result<Lead, Self::Error>> + Send + '_;

  /// Retrieve a lead with all of its events. Returns `None` if not found.
  fn get_lead(
    &self,
    id: LeadId,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  /// List every lead with its events, ordered by id.
  fn list_leads(
    &self,
  ) -> impl Future<Output = Result<Vec<Lead>, Self::Error>> + Send + '_;

  /// Overwrite the stored owner, allowed roles, and details of `lead`.
  /// The event collection is left as stored. Returns `None` if the lead no
  /// longer exists.
  fn update_lead(
    &self,
    lead: Lead,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  /// Append an event to an existing lead.
  fn add_event(
    &self,
    lead_id: LeadId,
    input: NewLeadEvent,
  ) -> impl Future<Output = Result<LeadEvent, Self::Error>> + Send + '_;
}
