//! The password identifier record.

use serde::{Deserialize, Serialize};

use crate::subject::SubjectId;

/// A stored password identifier.
///
/// `hash` is always the output of [`crate::hasher::derive`] applied to
/// `(user_id, name, current plaintext)` — never the plaintext itself.
/// `name` is globally unique and exactly one record exists per owning
/// subject; both constraints are enforced by the store at creation time.
/// Only `hash` is ever mutated, in place, on password change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRecord {
  pub name:    String,
  pub hash:    String,
  pub user_id: SubjectId,
}
