//! In-memory [`LeadStore`] for service tests.

use std::{convert::Infallible, sync::Mutex};

use chrono::Utc;

use crate::{
  event::{EventId, LeadEvent, NewLeadEvent},
  lead::{Lead, LeadId, NewLead},
  security::{RoleId, User, UserId},
  store::LeadStore,
};

pub fn user(id: i64, roles: &[i64]) -> User {
  User {
    id:       UserId(id),
    username: format!("user{id}"),
    roles:    roles.iter().copied().map(RoleId).collect(),
  }
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
  leads:      Vec<Lead>,
  next_lead:  i64,
  next_event: i64,
}

impl Inner {
  fn insert_lead(&mut self, input: NewLead) -> Lead {
    self.next_lead += 1;
    let lead = Lead {
      id:           LeadId(self.next_lead),
      owner:        input.owner,
      allowed:      input.allowed,
      created_date: Utc::now(),
      details:      input.details,
      events:       Vec::new(),
    };
    self.leads.push(lead.clone());
    lead
  }

  fn insert_event(&mut self, lead_id: LeadId, input: NewLeadEvent) -> Option<LeadEvent> {
    self.next_event += 1;
    let event = LeadEvent {
      id:           Some(EventId(self.next_event)),
      owner:        input.owner,
      allowed:      input.allowed,
      created_date: Utc::now(),
      lead:         Some(lead_id),
      kind:         input.kind,
    };
    let lead = self.leads.iter_mut().find(|l| l.id == lead_id)?;
    lead.events.push(event.clone());
    Some(event)
  }
}

impl LeadStore for MemoryStore {
  type Error = Infallible;

  async fn create_lead(&self, input: NewLead) -> Result<Lead, Infallible> {
    Ok(self.inner.lock().unwrap().insert_lead(input))
  }

  async fn create_lead_with_event(
    &self,
    lead: NewLead,
    event: NewLeadEvent,
  ) -> Result<Lead, Infallible> {
    let mut inner = self.inner.lock().unwrap();
    let mut lead = inner.insert_lead(lead);
    let event = inner.insert_event(lead.id, event).unwrap();
    lead.events.push(event);
    Ok(lead)
  }

  async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, Infallible> {
    let inner = self.inner.lock().unwrap();
    Ok(inner.leads.iter().find(|l| l.id == id).cloned())
  }

  async fn list_leads(&self) -> Result<Vec<Lead>, Infallible> {
    Ok(self.inner.lock().unwrap().leads.clone())
  }

  async fn update_lead(&self, lead: Lead) -> Result<Option<Lead>, Infallible> {
    let mut inner = self.inner.lock().unwrap();
    let Some(stored) = inner.leads.iter_mut().find(|l| l.id == lead.id) else {
      return Ok(None);
    };
    stored.owner = lead.owner;
    stored.allowed = lead.allowed;
    stored.details = lead.details;
    Ok(Some(stored.clone()))
  }

  async fn add_event(
    &self,
    lead_id: LeadId,
    input: NewLeadEvent,
  ) -> Result<LeadEvent, Infallible> {
    Ok(self.inner.lock().unwrap().insert_event(lead_id, input).unwrap())
  }
}
