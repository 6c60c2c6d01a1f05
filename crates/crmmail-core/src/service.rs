//! [`LeadService`]: visibility, defaulting, and persistence for leads.
//!
//! Every operation takes the authenticated caller explicitly. Reads only ever
//! return leads and events the caller can see; a lead that exists but is not
//! visible is reported exactly like one that does not exist.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
  Error, Result,
  event::{EmailMessage, LeadEvent, LeadEventKind, NewLeadEvent, Note},
  lead::{Lead, LeadBody, LeadId, NewLead},
  security::{RoleId, SecurityData, User},
  store::LeadStore,
};

pub struct LeadService<S> {
  store: Arc<S>,
}

impl<S> Clone for LeadService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: LeadStore> LeadService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Every lead visible to `caller`, each with only its visible events.
  pub async fn list_visible(&self, caller: &User) -> Result<Vec<Lead>> {
    let leads = self.store.list_leads().await.map_err(store_err)?;
    Ok(
      leads
        .into_iter()
        .filter(|lead| lead.is_visible_to(caller))
        .map(|lead| visible_events(lead, caller))
        .collect(),
    )
  }

  /// Load one lead for `caller`. Fails with [`Error::LeadNotFound`] when the
  /// lead is missing or not visible.
  pub async fn load(&self, id: LeadId, caller: &User) -> Result<Lead> {
    self
      .store
      .get_lead(id)
      .await
      .map_err(store_err)?
      .filter(|lead| lead.is_visible_to(caller))
      .map(|lead| visible_events(lead, caller))
      .ok_or(Error::LeadNotFound(id))
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Resolve a client payload into a creatable lead. The owner is always the
  /// caller; allowed roles default to the caller's roles when none are given.
  /// Any `id` in the payload is ignored.
  pub fn fill_defaults(&self, body: LeadBody, caller: &User) -> NewLead {
    NewLead {
      owner:   caller.id,
      allowed: body.allowed.unwrap_or_else(|| caller.roles.clone()),
      details: body.details,
    }
  }

  pub async fn create(&self, input: NewLead) -> Result<Lead> {
    self.store.create_lead(input).await.map_err(store_err)
  }

  /// Persist the owner, allowed roles, and details of an already loaded lead.
  ///
  /// The returned lead carries only the events that `lead` carried, so a
  /// lead loaded for one caller never comes back with another's events.
  pub async fn save(&self, mut lead: Lead) -> Result<Lead> {
    let id = lead.id;
    let known = std::mem::take(&mut lead.events);
    let mut saved = self
      .store
      .update_lead(lead)
      .await
      .map_err(store_err)?
      .ok_or(Error::LeadNotFound(id))?;
    saved.events.retain(|event| known.contains(event));
    Ok(saved)
  }

  /// Link a mail message to `lead`. The event is owned by `caller`; when
  /// `role_ids` is `None` it inherits the lead's allowed roles.
  pub async fn attach_email_event(
    &self,
    lead: &Lead,
    message: EmailMessage,
    role_ids: Option<BTreeSet<RoleId>>,
    caller: &User,
  ) -> Result<LeadEvent> {
    message.validate()?;
    let input = NewLeadEvent {
      owner:   caller.id,
      allowed: role_ids.unwrap_or_else(|| lead.allowed.clone()),
      kind:    LeadEventKind::Email(message),
    };
    self.store.add_event(lead.id, input).await.map_err(store_err)
  }

  /// Attach a free-text note to `lead`, with the same defaulting as
  /// [`LeadService::attach_email_event`].
  pub async fn attach_note(
    &self,
    lead: &Lead,
    text: String,
    role_ids: Option<BTreeSet<RoleId>>,
    caller: &User,
  ) -> Result<LeadEvent> {
    if text.trim().is_empty() {
      return Err(Error::InvalidField("Note text should not be blank".into()));
    }
    let input = NewLeadEvent {
      owner:   caller.id,
      allowed: role_ids.unwrap_or_else(|| lead.allowed.clone()),
      kind:    LeadEventKind::Note(Note { text }),
    };
    self.store.add_event(lead.id, input).await.map_err(store_err)
  }

  /// Create a defaulted, empty lead seeded with one email event. The lead
  /// and the event are written together or not at all.
  pub async fn create_with_email(
    &self,
    message: EmailMessage,
    role_ids: Option<BTreeSet<RoleId>>,
    caller: &User,
  ) -> Result<Lead> {
    message.validate()?;
    let lead = self.fill_defaults(LeadBody::default(), caller);
    let event = NewLeadEvent {
      owner:   caller.id,
      allowed: role_ids.unwrap_or_else(|| lead.allowed.clone()),
      kind:    LeadEventKind::Email(message),
    };
    self
      .store
      .create_lead_with_event(lead, event)
      .await
      .map_err(store_err)
  }
}

fn visible_events(mut lead: Lead, caller: &User) -> Lead {
  lead.events.retain(|event| event.is_visible_to(caller));
  lead
}

fn store_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}
