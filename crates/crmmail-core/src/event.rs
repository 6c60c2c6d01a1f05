//! Lead events: timestamped, role-gated records attached to a lead.
//!
//! The set of event variants is closed: [`LeadEventKind`] is an internally
//! tagged enum whose `type` tag is both the wire discriminant and the value of
//! the `event_type` database column.

use std::{
  collections::BTreeSet,
  fmt,
  hash::{Hash, Hasher},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  lead::LeadId,
  security::{RoleId, SecurityData, UserId},
};

/// Server-assigned identity of a persisted event.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Variants ────────────────────────────────────────────────────────────────

/// A mail message linked to a lead, addressed by its folder and IMAP UID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
  pub folder_id:   String,
  pub message_uid: i64,
}

impl EmailMessage {
  /// Build a message reference, rejecting a blank folder or negative UID.
  pub fn new(folder_id: impl Into<String>, message_uid: i64) -> Result<Self> {
    let message = Self { folder_id: folder_id.into(), message_uid };
    message.validate()?;
    Ok(message)
  }

  pub fn validate(&self) -> Result<()> {
    if self.folder_id.trim().is_empty() {
      return Err(Error::InvalidField("folderId should not be blank".into()));
    }
    if self.message_uid < 0 {
      return Err(Error::InvalidField(format!(
        "messageUid should not be negative, got {}",
        self.message_uid
      )));
    }
    Ok(())
  }
}

/// A free-text annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
  pub text: String,
}

/// The variant-specific payload of an event. The `type` tag is emitted next
/// to the variant's own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeadEventKind {
  Email(EmailMessage),
  Note(Note),
}

impl LeadEventKind {
  /// Every tag accepted by [`LeadEventKind::from_parts`].
  pub const TAGS: &'static [&'static str] = &["email", "note"];

  /// The literal `type` tag. Must match the `rename_all = "snake_case"` serde
  /// tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Email(_) => "email",
      Self::Note(_) => "note",
    }
  }

  /// Serialise the variant fields without the `type` tag, for the
  /// `value_json` database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let mut full = serde_json::to_value(self)?;
    if let Some(map) = full.as_object_mut() {
      map.remove("type");
    }
    Ok(full)
  }

  /// Rebuild a variant from its stored tag and payload.
  pub fn from_parts(discriminant: &str, data: serde_json::Value) -> Result<Self> {
    if !Self::TAGS.contains(&discriminant) {
      return Err(Error::UnknownEventType(discriminant.to_owned()));
    }
    let mut data = data;
    match data.as_object_mut() {
      Some(map) => {
        map.insert("type".into(), serde_json::Value::from(discriminant));
      }
      None => data = serde_json::json!({ "type": discriminant }),
    }
    Ok(serde_json::from_value(data)?)
  }
}

// ─── LeadEvent ───────────────────────────────────────────────────────────────

/// An event attached to a lead.
///
/// Visibility is carried per event and may differ from the parent lead's.
/// The back-reference to the lead is never serialised: the lead already holds
/// the forward collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadEvent {
  /// `None` until the event has been persisted.
  pub id:           Option<EventId>,
  pub owner:        UserId,
  #[serde(default)]
  pub allowed:      BTreeSet<RoleId>,
  /// Server-assigned; never accepted from a client.
  pub created_date: DateTime<Utc>,
  #[serde(skip)]
  pub lead:         Option<LeadId>,
  #[serde(flatten)]
  pub kind:         LeadEventKind,
}

impl LeadEvent {
  pub fn event_type(&self) -> &'static str { self.kind.discriminant() }
}

/// Same variant and same assigned id. An unsaved event equals only itself.
impl PartialEq for LeadEvent {
  fn eq(&self, other: &Self) -> bool {
    if std::ptr::eq(self, other) {
      return true;
    }
    if self.event_type() != other.event_type() {
      return false;
    }
    matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
  }
}

impl Eq for LeadEvent {}

/// Hashes the variant tag only, so the hash is unchanged when an id is
/// assigned on persist.
impl Hash for LeadEvent {
  fn hash<H: Hasher>(&self, state: &mut H) { self.event_type().hash(state); }
}

impl SecurityData for LeadEvent {
  fn owner(&self) -> UserId { self.owner }

  fn allowed(&self) -> &BTreeSet<RoleId> { &self.allowed }
}

// ─── NewLeadEvent ────────────────────────────────────────────────────────────

/// Input to [`crate::store::LeadStore::add_event`].
/// `id`, `created_date`, and the lead link are always set by the store.
#[derive(Debug, Clone)]
pub struct NewLeadEvent {
  pub owner:   UserId,
  pub allowed: BTreeSet<RoleId>,
  pub kind:    LeadEventKind,
}

#[cfg(test)]
mod tests {
  use std::{
    collections::{HashSet, hash_map::DefaultHasher},
    hash::{Hash, Hasher},
  };

  use super::*;

  fn email(id: Option<i64>) -> LeadEvent {
    LeadEvent {
      id:           id.map(EventId),
      owner:        UserId(1),
      allowed:      [RoleId(1), RoleId(2)].into(),
      created_date: Utc::now(),
      lead:         Some(LeadId(5)),
      kind:         LeadEventKind::Email(EmailMessage {
        folder_id:   "INBOX".into(),
        message_uid: 42,
      }),
    }
  }

  fn note(id: Option<i64>) -> LeadEvent {
    LeadEvent {
      kind: LeadEventKind::Note(Note { text: "called back".into() }),
      ..email(id)
    }
  }

  fn hash_of(e: &LeadEvent) -> u64 {
    let mut h = DefaultHasher::new();
    e.hash(&mut h);
    h.finish()
  }

  // ─── Identity ──────────────────────────────────────────────────────────────

  #[test]
  fn same_variant_same_id_are_equal() {
    assert_eq!(email(Some(3)), email(Some(3)));
  }

  #[test]
  fn different_ids_are_not_equal() {
    assert_ne!(email(Some(3)), email(Some(4)));
  }

  #[test]
  fn different_variants_with_same_id_are_not_equal() {
    assert_ne!(email(Some(3)), note(Some(3)));
  }

  #[test]
  #[allow(clippy::eq_op)]
  fn unsaved_event_equals_only_itself() {
    let a = email(None);
    let b = a.clone();
    assert_eq!(a, a);
    assert_ne!(a, b);
    assert_ne!(a, email(Some(3)));
    assert_ne!(email(Some(3)), a);
  }

  #[test]
  fn hash_is_stable_across_id_assignment() {
    let mut e = email(None);
    let before = hash_of(&e);
    e.id = Some(EventId(99));
    assert_eq!(before, hash_of(&e));
  }

  #[test]
  fn hash_set_keeps_distinct_unsaved_events() {
    let mut set = HashSet::new();
    set.insert(email(None));
    set.insert(email(None));
    set.insert(email(Some(1)));
    set.insert(email(Some(1)));
    assert_eq!(set.len(), 3);
  }

  // ─── Serialisation ─────────────────────────────────────────────────────────

  #[test]
  fn serialises_type_tag_and_omits_lead_link() {
    let json = serde_json::to_value(email(Some(3))).unwrap();
    assert_eq!(json["type"], "email");
    assert_eq!(json["folderId"], "INBOX");
    assert_eq!(json["messageUid"], 42);
    assert_eq!(json["id"], 3);
    assert!(json.get("lead").is_none());
    assert!(json.get("createdDate").is_some());
  }

  #[test]
  fn deserialises_by_type_tag() {
    let json = serde_json::json!({
      "id": 8,
      "owner": 2,
      "allowed": [4],
      "createdDate": "2024-01-01T00:00:00Z",
      "type": "note",
      "text": "met at conference",
    });
    let e: LeadEvent = serde_json::from_value(json).unwrap();
    assert_eq!(e.event_type(), "note");
    assert_eq!(e.lead, None);
    assert!(matches!(e.kind, LeadEventKind::Note(ref n) if n.text == "met at conference"));
  }

  #[test]
  fn stored_parts_rebuild_the_variant() {
    let kind = email(None).kind;
    let data = kind.to_json().unwrap();
    assert!(data.get("type").is_none());
    let back = LeadEventKind::from_parts(kind.discriminant(), data).unwrap();
    assert_eq!(back, kind);
  }

  #[test]
  fn unknown_stored_tag_is_rejected() {
    let err = LeadEventKind::from_parts("fax", serde_json::json!({})).unwrap_err();
    assert!(matches!(err, Error::UnknownEventType(ref t) if t == "fax"));
  }

  #[test]
  fn email_message_rejects_blank_folder_and_negative_uid() {
    assert!(EmailMessage::new("INBOX", 0).is_ok());
    assert!(matches!(EmailMessage::new(" ", 1), Err(Error::InvalidField(_))));
    assert!(matches!(EmailMessage::new("INBOX", -5), Err(Error::InvalidField(_))));
  }
}
