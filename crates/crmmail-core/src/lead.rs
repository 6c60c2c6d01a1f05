//! The lead aggregate, its inbound payload, and the partial-update merge.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  event::LeadEvent,
  security::{RoleId, SecurityData, UserId},
};

/// Server-assigned identity of a lead.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LeadId(pub i64);

impl fmt::Display for LeadId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Details ─────────────────────────────────────────────────────────────────

/// Descriptive attributes of a lead. Every field is nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetails {
  pub title:        Option<String>,
  pub contact_name: Option<String>,
  pub email:        Option<String>,
  pub phone:        Option<String>,
  pub company:      Option<String>,
  pub description:  Option<String>,
}

impl LeadDetails {
  /// Copy every `Some` field of `patch` over `self`.
  pub fn overlay(&mut self, patch: LeadDetails) {
    fn put(slot: &mut Option<String>, value: Option<String>) {
      if value.is_some() {
        *slot = value;
      }
    }
    put(&mut self.title, patch.title);
    put(&mut self.contact_name, patch.contact_name);
    put(&mut self.email, patch.email);
    put(&mut self.phone, patch.phone);
    put(&mut self.company, patch.company);
    put(&mut self.description, patch.description);
  }
}

// ─── Lead ────────────────────────────────────────────────────────────────────

/// The aggregate root. Owns its events; an event never outlives its lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
  pub id:           LeadId,
  pub owner:        UserId,
  pub allowed:      BTreeSet<RoleId>,
  /// Server-assigned; never changes after creation.
  pub created_date: DateTime<Utc>,
  #[serde(flatten)]
  pub details:      LeadDetails,
  #[serde(default)]
  pub events:       Vec<LeadEvent>,
}

impl SecurityData for Lead {
  fn owner(&self) -> UserId { self.owner }

  fn allowed(&self) -> &BTreeSet<RoleId> { &self.allowed }
}

// ─── NewLead ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::LeadStore::create_lead`].
/// `id` and `created_date` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewLead {
  pub owner:   UserId,
  pub allowed: BTreeSet<RoleId>,
  pub details: LeadDetails,
}

// ─── LeadBody ────────────────────────────────────────────────────────────────

/// A lead as sent by a client. Any field may be missing or `null`.
///
/// Events and `createdDate` are not part of the inbound shape; unknown keys
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadBody {
  pub id:      Option<LeadId>,
  pub owner:   Option<UserId>,
  pub allowed: Option<BTreeSet<RoleId>>,
  #[serde(flatten)]
  pub details: LeadDetails,
}

impl LeadBody {
  /// Discard any client-supplied `id` and `owner`. Applied on every create.
  pub fn strip_identity(mut self) -> Self {
    self.id = None;
    self.owner = None;
    self
  }

  /// Partial update: every non-null field of `self` overwrites `target`;
  /// null fields leave the persisted value untouched.
  ///
  /// `owner` and `allowed` are merged like any other field, so a caller that
  /// can see a lead can also re-gate it. `id` is never rewritten.
  pub fn merge_into(self, target: &mut Lead) {
    if let Some(owner) = self.owner {
      target.owner = owner;
    }
    if let Some(allowed) = self.allowed {
      target.allowed = allowed;
    }
    target.details.overlay(self.details);
  }

  /// Whether merging would touch a field that gates visibility.
  pub fn touches_security(&self, target: &Lead) -> bool {
    self.owner.is_some_and(|o| o != target.owner)
      || self.allowed.as_ref().is_some_and(|a| *a != target.allowed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn persisted() -> Lead {
    Lead {
      id:           LeadId(5),
      owner:        UserId(1),
      allowed:      [RoleId(1)].into(),
      created_date: Utc::now(),
      details:      LeadDetails {
        title:        Some("Fleet renewal".into()),
        contact_name: Some("Dana Ruiz".into()),
        email:        Some("dana@example.com".into()),
        phone:        None,
        company:      Some("Ruiz Logistics".into()),
        description:  None,
      },
      events:       Vec::new(),
    }
  }

  #[test]
  fn single_field_patch_replaces_only_that_field() {
    let before = persisted();
    let mut after = before.clone();
    let body = LeadBody {
      details: LeadDetails { phone: Some("+1 555 0100".into()), ..Default::default() },
      ..Default::default()
    };
    body.merge_into(&mut after);

    assert_eq!(after.details.phone.as_deref(), Some("+1 555 0100"));
    assert_eq!(after.details.title, before.details.title);
    assert_eq!(after.details.contact_name, before.details.contact_name);
    assert_eq!(after.details.email, before.details.email);
    assert_eq!(after.details.company, before.details.company);
    assert_eq!(after.details.description, before.details.description);
    assert_eq!(after.owner, before.owner);
    assert_eq!(after.allowed, before.allowed);
    assert_eq!(after.id, before.id);
  }

  #[test]
  fn null_fields_in_json_leave_values_untouched() {
    let mut lead = persisted();
    let body: LeadBody = serde_json::from_value(serde_json::json!({
      "id": 5,
      "title": null,
      "company": "Ruiz Freight",
    }))
    .unwrap();
    body.merge_into(&mut lead);
    assert_eq!(lead.details.title.as_deref(), Some("Fleet renewal"));
    assert_eq!(lead.details.company.as_deref(), Some("Ruiz Freight"));
  }

  #[test]
  fn merge_can_overwrite_owner_and_allowed() {
    let mut lead = persisted();
    let body = LeadBody {
      owner: Some(UserId(9)),
      allowed: Some([RoleId(4), RoleId(5)].into()),
      ..Default::default()
    };
    assert!(body.touches_security(&lead));
    body.merge_into(&mut lead);
    assert_eq!(lead.owner, UserId(9));
    assert_eq!(lead.allowed, [RoleId(4), RoleId(5)].into());
  }

  #[test]
  fn merge_never_rewrites_id() {
    let mut lead = persisted();
    LeadBody { id: Some(LeadId(77)), ..Default::default() }.merge_into(&mut lead);
    assert_eq!(lead.id, LeadId(5));
  }

  #[test]
  fn strip_identity_clears_id_and_owner_only() {
    let body = LeadBody {
      id: Some(LeadId(3)),
      owner: Some(UserId(8)),
      allowed: Some([RoleId(2)].into()),
      details: LeadDetails { title: Some("x".into()), ..Default::default() },
    }
    .strip_identity();
    assert_eq!(body.id, None);
    assert_eq!(body.owner, None);
    assert_eq!(body.allowed, Some([RoleId(2)].into()));
    assert_eq!(body.details.title.as_deref(), Some("x"));
  }

  #[test]
  fn lead_serialises_flat_camel_case() {
    let json = serde_json::to_value(persisted()).unwrap();
    assert_eq!(json["id"], 5);
    assert_eq!(json["owner"], 1);
    assert_eq!(json["contactName"], "Dana Ruiz");
    assert_eq!(json["allowed"], serde_json::json!([1]));
    assert!(json["events"].as_array().unwrap().is_empty());
  }
}
