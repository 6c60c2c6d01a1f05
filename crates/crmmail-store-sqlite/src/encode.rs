//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Role sets and event payloads
//! are stored as compact JSON. Ids are stored as native integers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use crmmail_core::{
  event::{EventId, LeadEvent, LeadEventKind, NewLeadEvent},
  lead::{Lead, LeadDetails, LeadId},
  security::{RoleId, UserId},
};

use crate::{Error, Result};

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Roles ───────────────────────────────────────────────────────────────────

pub fn encode_roles(roles: &BTreeSet<RoleId>) -> Result<String> {
  Ok(serde_json::to_string(roles)?)
}

pub fn decode_roles(s: &str) -> Result<BTreeSet<RoleId>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Write-side rows ─────────────────────────────────────────────────────────

pub const LEAD_COLUMNS: &str = "lead_id, owner_id, allowed, created_date, \
                                title, contact_name, email, phone, company, description";

pub const EVENT_COLUMNS: &str =
  "event_id, lead_id, owner_id, allowed, created_date, event_type, value_json";

/// A lead's column values, owned so they can move onto the database thread.
pub struct LeadRow {
  pub owner_id:     i64,
  pub allowed:      String,
  pub created_date: String,
  pub details:      LeadDetails,
}

impl LeadRow {
  pub fn new(
    owner: UserId,
    allowed: &BTreeSet<RoleId>,
    created_date: DateTime<Utc>,
    details: &LeadDetails,
  ) -> Result<Self> {
    Ok(Self {
      owner_id:     owner.0,
      allowed:      encode_roles(allowed)?,
      created_date: encode_dt(created_date),
      details:      details.clone(),
    })
  }
}

/// An event's column values, minus the lead id which may not exist yet.
pub struct EventRow {
  pub owner_id:     i64,
  pub allowed:      String,
  pub created_date: String,
  pub event_type:   &'static str,
  pub value_json:   String,
}

impl EventRow {
  pub fn new(input: &NewLeadEvent, created_date: DateTime<Utc>) -> Result<Self> {
    Ok(Self {
      owner_id:     input.owner.0,
      allowed:      encode_roles(&input.allowed)?,
      created_date: encode_dt(created_date),
      event_type:   input.kind.discriminant(),
      value_json:   input.kind.to_json()?.to_string(),
    })
  }
}

// ─── Read-side rows ──────────────────────────────────────────────────────────

/// Raw values read directly from a `leads` row, in [`LEAD_COLUMNS`] order.
pub struct RawLead {
  pub lead_id:      i64,
  pub owner_id:     i64,
  pub allowed:      String,
  pub created_date: String,
  pub title:        Option<String>,
  pub contact_name: Option<String>,
  pub email:        Option<String>,
  pub phone:        Option<String>,
  pub company:      Option<String>,
  pub description:  Option<String>,
}

impl RawLead {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      lead_id:      row.get(0)?,
      owner_id:     row.get(1)?,
      allowed:      row.get(2)?,
      created_date: row.get(3)?,
      title:        row.get(4)?,
      contact_name: row.get(5)?,
      email:        row.get(6)?,
      phone:        row.get(7)?,
      company:      row.get(8)?,
      description:  row.get(9)?,
    })
  }

  pub fn into_lead(self, events: Vec<LeadEvent>) -> Result<Lead> {
    Ok(Lead {
      id: LeadId(self.lead_id),
      owner: UserId(self.owner_id),
      allowed: decode_roles(&self.allowed)?,
      created_date: decode_dt(&self.created_date)?,
      details: LeadDetails {
        title:        self.title,
        contact_name: self.contact_name,
        email:        self.email,
        phone:        self.phone,
        company:      self.company,
        description:  self.description,
      },
      events,
    })
  }
}

/// Raw values read directly from a `lead_events` row, in [`EVENT_COLUMNS`]
/// order.
pub struct RawEvent {
  pub event_id:     i64,
  pub lead_id:      i64,
  pub owner_id:     i64,
  pub allowed:      String,
  pub created_date: String,
  pub event_type:   String,
  pub value_json:   String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      lead_id:      row.get(1)?,
      owner_id:     row.get(2)?,
      allowed:      row.get(3)?,
      created_date: row.get(4)?,
      event_type:   row.get(5)?,
      value_json:   row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<LeadEvent> {
    let value: serde_json::Value = serde_json::from_str(&self.value_json)?;
    Ok(LeadEvent {
      id:           Some(EventId(self.event_id)),
      owner:        UserId(self.owner_id),
      allowed:      decode_roles(&self.allowed)?,
      created_date: decode_dt(&self.created_date)?,
      lead:         Some(LeadId(self.lead_id)),
      kind:         LeadEventKind::from_parts(&self.event_type, value)?,
    })
  }
}
