//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use wicket_core::{
  credential::IdentifierRecord,
  subject::{Profile, Subject, SubjectView},
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `identifiers` row.
pub struct RawIdentifier {
  pub name:    String,
  pub hash:    String,
  pub user_id: String,
}

impl RawIdentifier {
  pub fn into_record(self) -> Result<IdentifierRecord> {
    Ok(IdentifierRecord {
      name:    self.name,
      hash:    self.hash,
      user_id: decode_uuid(&self.user_id)?,
    })
  }
}

/// Raw strings from a `subjects` row joined with its `profiles` row.
pub struct RawSubjectView {
  pub subject_id: String,
  pub created_at: String,
  pub first_name: String,
}

impl RawSubjectView {
  pub fn into_view(self) -> Result<SubjectView> {
    Ok(SubjectView {
      subject: Subject {
        subject_id: decode_uuid(&self.subject_id)?,
        created_at: decode_dt(&self.created_at)?,
      },
      profile: Profile { first_name: self.first_name },
    })
  }
}
