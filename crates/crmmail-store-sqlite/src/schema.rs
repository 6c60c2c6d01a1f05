//! SQL schema for the crmmail SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS leads (
    lead_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id     INTEGER NOT NULL,
    allowed      TEXT NOT NULL DEFAULT '[]',   -- JSON array of role ids
    created_date TEXT NOT NULL,                -- ISO 8601 UTC; server-assigned
    title        TEXT,
    contact_name TEXT,
    email        TEXT,
    phone        TEXT,
    company      TEXT,
    description  TEXT
);

-- Events are append-only and only removed together with their lead.
CREATE TABLE IF NOT EXISTS lead_events (
    event_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    lead_id      INTEGER NOT NULL REFERENCES leads(lead_id) ON DELETE CASCADE,
    owner_id     INTEGER NOT NULL,
    allowed      TEXT NOT NULL DEFAULT '[]',
    created_date TEXT NOT NULL,
    event_type   TEXT NOT NULL,                -- discriminant of LeadEventKind
    value_json   TEXT NOT NULL                 -- variant fields without the tag
);

CREATE INDEX IF NOT EXISTS lead_events_lead_idx ON lead_events(lead_id);
CREATE INDEX IF NOT EXISTS lead_events_type_idx ON lead_events(event_type);

PRAGMA user_version = 1;
";
