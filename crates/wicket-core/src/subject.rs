//! Subject — the owner of a password credential and a profile.
//!
//! A subject holds only identity metadata. User-facing attributes live in
//! the profile, created together with it during registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque stable identifier naming the owner of credentials.
pub type SubjectId = Uuid;

/// A thin envelope that owns a UUID and a creation timestamp.
/// Created once, during registration; never deleted by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: SubjectId,
  pub created_at: DateTime<Utc>,
}

/// Profile attributes owned by a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub first_name: String,
}

/// A subject with its resolved profile — the read model handed back to
/// callers after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectView {
  pub subject: Subject,
  pub profile: Profile,
}
