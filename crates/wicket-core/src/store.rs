//! The `CredentialStore` and `SubjectRegistry` traits.
//!
//! Implemented by storage backends (e.g. `wicket-store-sqlite`). Higher
//! layers (`wicket-http`, the workflow) depend on these abstractions, not
//! on any concrete backend.

use std::future::Future;

use crate::{
  credential::IdentifierRecord,
  error::StoreError,
  subject::{Profile, SubjectId, SubjectView},
};

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Persistence of password identifier records, keyed by globally-unique
/// name and by owning subject.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CredentialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Atomically check-and-insert a record for `name`.
  ///
  /// Under concurrent creation of the same name exactly one call succeeds
  /// and the rest observe [`StoreError::DuplicateIdentifier`]. Backends
  /// must enforce this with a storage-level unique constraint or an
  /// equivalent serialized critical section.
  fn create(
    &self,
    name: String,
    hash: String,
    user_id: SubjectId,
  ) -> impl Future<Output = Result<IdentifierRecord, StoreError<Self::Error>>> + Send + '_;

  /// Look up a record by identifier name. `None` if absent.
  fn find_by_name(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<IdentifierRecord>, Self::Error>> + Send + '_;

  /// Look up the record owned by `user_id`. `None` if absent.
  fn find_by_subject(
    &self,
    user_id: SubjectId,
  ) -> impl Future<Output = Result<Option<IdentifierRecord>, Self::Error>> + Send + '_;

  /// Replace the stored hash in place; no new identity is created.
  fn update_hash(
    &self,
    record: IdentifierRecord,
    new_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Subjects ────────────────────────────────────────────────────────────────

/// Creation and lookup of subjects and their profiles.
pub trait SubjectRegistry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create a subject, its profile, and its password credential in one
  /// atomic step.
  ///
  /// The store assigns the subject id and passes it to `hash_with` so the
  /// credential hash can incorporate it; the plaintext never crosses this
  /// boundary. A duplicate `identifier_name` fails the whole step — no
  /// orphaned subject or profile is left behind.
  fn create_subject<F>(
    &self,
    profile: Profile,
    identifier_name: String,
    hash_with: F,
  ) -> impl Future<Output = Result<SubjectView, StoreError<Self::Error>>> + Send + '_
  where
    F: FnOnce(SubjectId) -> String + Send + 'static;

  /// Retrieve a subject with its resolved profile. `None` if not found.
  fn get_subject(
    &self,
    id: SubjectId,
  ) -> impl Future<Output = Result<Option<SubjectView>, Self::Error>> + Send + '_;
}
