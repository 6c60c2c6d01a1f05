//! [`SqliteStore`], the SQLite implementation of [`LeadStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crmmail_core::{
  event::{EventId, LeadEvent, NewLeadEvent},
  lead::{Lead, LeadId, NewLead},
  store::LeadStore,
};

use crate::{
  Error, Result,
  encode::{EVENT_COLUMNS, EventRow, LEAD_COLUMNS, LeadRow, RawEvent, RawLead},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A lead store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers (run on the database thread) ────────────────────────────────

fn insert_lead(conn: &rusqlite::Connection, row: &LeadRow) -> rusqlite::Result<i64> {
  let d = &row.details;
  conn.execute(
    "INSERT INTO leads (
       owner_id, allowed, created_date,
       title, contact_name, email, phone, company, description
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      row.owner_id,
      row.allowed,
      row.created_date,
      d.title,
      d.contact_name,
      d.email,
      d.phone,
      d.company,
      d.description,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn insert_event(
  conn: &rusqlite::Connection,
  lead_id: i64,
  row: &EventRow,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO lead_events (
       lead_id, owner_id, allowed, created_date, event_type, value_json
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      lead_id,
      row.owner_id,
      row.allowed,
      row.created_date,
      row.event_type,
      row.value_json,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn select_lead(
  conn: &rusqlite::Connection,
  lead_id: i64,
) -> rusqlite::Result<Option<(RawLead, Vec<RawEvent>)>> {
  let lead = conn
    .query_row(
      &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE lead_id = ?1"),
      rusqlite::params![lead_id],
      RawLead::from_row,
    )
    .optional()?;

  let Some(lead) = lead else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(&format!(
    "SELECT {EVENT_COLUMNS} FROM lead_events WHERE lead_id = ?1 ORDER BY event_id"
  ))?;
  let events = stmt
    .query_map(rusqlite::params![lead_id], RawEvent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some((lead, events)))
}

fn decode_lead(raw: RawLead, events: Vec<RawEvent>) -> Result<Lead> {
  let events = events
    .into_iter()
    .map(RawEvent::into_event)
    .collect::<Result<Vec<_>>>()?;
  raw.into_lead(events)
}

// ─── LeadStore impl ──────────────────────────────────────────────────────────

impl LeadStore for SqliteStore {
  type Error = Error;

  async fn create_lead(&self, input: NewLead) -> Result<Lead> {
    let created_date = Utc::now();
    let row = LeadRow::new(input.owner, &input.allowed, created_date, &input.details)?;

    let lead_id = self
      .conn
      .call(move |conn| Ok(insert_lead(conn, &row)?))
      .await?;

    Ok(Lead {
      id: LeadId(lead_id),
      owner: input.owner,
      allowed: input.allowed,
      created_date,
      details: input.details,
      events: Vec::new(),
    })
  }

  async fn create_lead_with_event(
    &self,
    lead: NewLead,
    event: NewLeadEvent,
  ) -> Result<Lead> {
    let created_date = Utc::now();
    let lead_row = LeadRow::new(lead.owner, &lead.allowed, created_date, &lead.details)?;
    let event_row = EventRow::new(&event, created_date)?;

    let (lead_id, event_id) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let lead_id = insert_lead(&tx, &lead_row)?;
        let event_id = insert_event(&tx, lead_id, &event_row)?;
        tx.commit()?;
        Ok((lead_id, event_id))
      })
      .await?;

    let id = LeadId(lead_id);
    Ok(Lead {
      id,
      owner: lead.owner,
      allowed: lead.allowed,
      created_date,
      details: lead.details,
      events: vec![LeadEvent {
        id: Some(EventId(event_id)),
        owner: event.owner,
        allowed: event.allowed,
        created_date,
        lead: Some(id),
        kind: event.kind,
      }],
    })
  }

  async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_lead(conn, id.0)?))
      .await?;

    raw.map(|(lead, events)| decode_lead(lead, events)).transpose()
  }

  async fn list_leads(&self) -> Result<Vec<Lead>> {
    let (raw_leads, raw_events) = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY lead_id"))?;
        let leads = stmt
          .query_map([], RawLead::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM lead_events ORDER BY event_id"
        ))?;
        let events = stmt
          .query_map([], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((leads, events))
      })
      .await?;

    let mut by_lead: BTreeMap<i64, Vec<RawEvent>> = BTreeMap::new();
    for event in raw_events {
      by_lead.entry(event.lead_id).or_default().push(event);
    }

    raw_leads
      .into_iter()
      .map(|lead| {
        let events = by_lead.remove(&lead.lead_id).unwrap_or_default();
        decode_lead(lead, events)
      })
      .collect()
  }

  async fn update_lead(&self, lead: Lead) -> Result<Option<Lead>> {
    let row = LeadRow::new(lead.owner, &lead.allowed, lead.created_date, &lead.details)?;
    let lead_id = lead.id.0;

    let raw = self
      .conn
      .call(move |conn| {
        let d = &row.details;
        let changed = conn.execute(
          "UPDATE leads SET
             owner_id = ?2, allowed = ?3,
             title = ?4, contact_name = ?5, email = ?6,
             phone = ?7, company = ?8, description = ?9
           WHERE lead_id = ?1",
          rusqlite::params![
            lead_id,
            row.owner_id,
            row.allowed,
            d.title,
            d.contact_name,
            d.email,
            d.phone,
            d.company,
            d.description,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_lead(conn, lead_id)?)
      })
      .await?;

    raw.map(|(lead, events)| decode_lead(lead, events)).transpose()
  }

  async fn add_event(&self, lead_id: LeadId, input: NewLeadEvent) -> Result<LeadEvent> {
    let created_date = Utc::now();
    let row = EventRow::new(&input, created_date)?;

    let event_id = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM leads WHERE lead_id = ?1",
            rusqlite::params![lead_id.0],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }
        Ok(Some(insert_event(conn, lead_id.0, &row)?))
      })
      .await?
      .ok_or(Error::LeadNotFound(lead_id))?;

    Ok(LeadEvent {
      id: Some(EventId(event_id)),
      owner: input.owner,
      allowed: input.allowed,
      created_date,
      lead: Some(lead_id),
      kind: input.kind,
    })
  }
}
