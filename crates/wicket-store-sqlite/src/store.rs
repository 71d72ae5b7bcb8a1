//! [`SqliteStore`] — the SQLite implementation of [`CredentialStore`] and
//! [`SubjectRegistry`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use wicket_core::{
  credential::IdentifierRecord,
  error::StoreError,
  store::{CredentialStore, SubjectRegistry},
  subject::{Profile, Subject, SubjectId, SubjectView},
};

use crate::{
  encode::{encode_dt, encode_uuid, RawIdentifier, RawSubjectView},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A wicket credential store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
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

  #[cfg(test)]
  pub(crate) async fn insert_bare_subject(&self) -> Result<SubjectId> {
    let id = Uuid::new_v4();
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (subject_id, created_at) VALUES (?1, ?2)",
          rusqlite::params![id_str, at_str],
        )?;
        conn.execute(
          "INSERT INTO profiles (subject_id, first_name) VALUES (?1, '')",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(id)
  }

  #[cfg(test)]
  pub(crate) async fn subject_count(&self) -> Result<i64> {
    Ok(
      self
        .conn
        .call(|conn| {
          Ok(conn.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get(0))?)
        })
        .await?,
    )
  }
}

/// True when `err` is a violation of the named unique constraint.
///
/// SQLite reports these as `SQLITE_CONSTRAINT` with a message of the form
/// `UNIQUE constraint failed: <table>.<column>`.
fn is_unique_violation(err: &tokio_rusqlite::Error, constraint: &str) -> bool {
  match err {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, Some(msg))) => {
      e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(constraint)
    }
    _ => false,
  }
}

// ─── CredentialStore impl ────────────────────────────────────────────────────

impl CredentialStore for SqliteStore {
  type Error = Error;

  async fn create(
    &self,
    name:    String,
    hash:    String,
    user_id: SubjectId,
  ) -> Result<IdentifierRecord, StoreError<Error>> {
    let record = IdentifierRecord { name, hash, user_id };

    let name_str = record.name.clone();
    let hash_str = record.hash.clone();
    let user_str = encode_uuid(user_id);

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identifiers (name, hash, user_id) VALUES (?1, ?2, ?3)",
          rusqlite::params![name_str, hash_str, user_str],
        )?;
        Ok(())
      })
      .await;

    match inserted {
      Ok(()) => Ok(record),
      Err(e) if is_unique_violation(&e, "identifiers.name") => {
        Err(StoreError::DuplicateIdentifier(record.name))
      }
      Err(e) => Err(StoreError::Backend(Error::Database(e))),
    }
  }

  async fn find_by_name(&self, name: String) -> Result<Option<IdentifierRecord>> {
    let raw: Option<RawIdentifier> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT name, hash, user_id FROM identifiers WHERE name = ?1",
              rusqlite::params![name],
              |row| {
                Ok(RawIdentifier {
                  name:    row.get(0)?,
                  hash:    row.get(1)?,
                  user_id: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentifier::into_record).transpose()
  }

  async fn find_by_subject(&self, user_id: SubjectId) -> Result<Option<IdentifierRecord>> {
    let user_str = encode_uuid(user_id);

    let raw: Option<RawIdentifier> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT name, hash, user_id FROM identifiers WHERE user_id = ?1",
              rusqlite::params![user_str],
              |row| {
                Ok(RawIdentifier {
                  name:    row.get(0)?,
                  hash:    row.get(1)?,
                  user_id: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentifier::into_record).transpose()
  }

  async fn update_hash(&self, record: IdentifierRecord, new_hash: String) -> Result<()> {
    let name = record.name;
    let stmt_name = name.clone();

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identifiers SET hash = ?1 WHERE name = ?2",
          rusqlite::params![new_hash, stmt_name],
        )?)
      })
      .await?;

    // A zero-row UPDATE means the record vanished out from under us;
    // surface that instead of silently succeeding.
    if affected == 0 {
      return Err(Error::MissingIdentifier(name));
    }
    Ok(())
  }
}

// ─── SubjectRegistry impl ────────────────────────────────────────────────────

impl SubjectRegistry for SqliteStore {
  type Error = Error;

  async fn create_subject<F>(
    &self,
    profile:         Profile,
    identifier_name: String,
    hash_with:       F,
  ) -> Result<SubjectView, StoreError<Error>>
  where
    F: FnOnce(SubjectId) -> String + Send + 'static,
  {
    let view = SubjectView {
      subject: Subject {
        subject_id: Uuid::new_v4(),
        created_at: Utc::now(),
      },
      profile,
    };

    let id_str     = encode_uuid(view.subject.subject_id);
    let at_str     = encode_dt(view.subject.created_at);
    let first_name = view.profile.first_name.clone();
    let hash       = hash_with(view.subject.subject_id);
    let name       = identifier_name.clone();

    // One transaction: a duplicate identifier rolls back the subject and
    // profile rows too, so no orphaned subject survives a lost race.
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO subjects (subject_id, created_at) VALUES (?1, ?2)",
          rusqlite::params![id_str, at_str],
        )?;
        tx.execute(
          "INSERT INTO profiles (subject_id, first_name) VALUES (?1, ?2)",
          rusqlite::params![id_str, first_name],
        )?;
        tx.execute(
          "INSERT INTO identifiers (name, hash, user_id) VALUES (?1, ?2, ?3)",
          rusqlite::params![name, hash, id_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await;

    match inserted {
      Ok(()) => Ok(view),
      Err(e) if is_unique_violation(&e, "identifiers.name") => {
        Err(StoreError::DuplicateIdentifier(identifier_name))
      }
      Err(e) => Err(StoreError::Backend(Error::Database(e))),
    }
  }

  async fn get_subject(&self, id: SubjectId) -> Result<Option<SubjectView>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubjectView> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT s.subject_id, s.created_at, p.first_name
               FROM subjects s
               JOIN profiles p ON p.subject_id = s.subject_id
               WHERE s.subject_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawSubjectView {
                  subject_id: row.get(0)?,
                  created_at: row.get(1)?,
                  first_name: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubjectView::into_view).transpose()
  }
}
