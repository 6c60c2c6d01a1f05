//! Actors, roles, and the row-level visibility rule.
//!
//! Every ownable record carries an owner and a set of allowed roles. A caller
//! sees a record if they own it or hold at least one of its allowed roles.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Identity of a user account.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Identity of a role that can be granted visibility on a record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoleId(pub i64);

impl fmt::Display for RoleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Actor ───────────────────────────────────────────────────────────────────

/// An authenticated actor. Passed explicitly to every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:       UserId,
  pub username: String,
  pub roles:    BTreeSet<RoleId>,
}

// ─── SecurityData ────────────────────────────────────────────────────────────

/// Implemented by every ownable, role-gated record.
pub trait SecurityData {
  /// The user that created or controls the record.
  fn owner(&self) -> UserId;

  /// Roles granted visibility independent of ownership.
  fn allowed(&self) -> &BTreeSet<RoleId>;

  /// Owner match, or a non-empty intersection between `allowed` and the
  /// user's roles.
  fn is_visible_to(&self, user: &User) -> bool {
    self.owner() == user.id || !self.allowed().is_disjoint(&user.roles)
  }
}
