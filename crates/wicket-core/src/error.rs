//! Error types for `wicket-core`.

use thiserror::Error;

/// The closed set of request-scoped authentication failures.
///
/// Each variant carries its exact caller-visible message; callers rely on
/// the literal text. None of these is process-fatal and none is retried —
/// they represent invalid input or state, not transient faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("Retype password mismatch")]
  RetypeMismatch,

  #[error("User Name {0} already in use.")]
  DuplicateIdentifier(String),

  #[error("Identifier not found")]
  IdentifierNotFound,

  #[error("Password Mismatch")]
  PasswordMismatch,

  #[error("Old Password Mismatch")]
  OldPasswordMismatch,

  #[error("New password is same as old password")]
  SamePassword,

  #[error("No Password Identifier associate to this user.")]
  NoIdentifierForSubject,
}

/// Store-level failure: the one domain condition callers must be able to
/// distinguish (a duplicate identifier name) or a backend fault.
#[derive(Debug, Error)]
pub enum StoreError<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  /// The identifier name is already taken. Raised by the store's atomic
  /// check-and-insert, never by a separate pre-check.
  #[error("identifier name {0:?} already exists")]
  DuplicateIdentifier(String),

  #[error("backend error: {0}")]
  Backend(#[source] E),
}

/// Workflow-level error: infrastructure faults only. Invalid input and
/// state conditions surface as [`AuthError`]s inside
/// [`crate::workflow::Outcome`].
#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box an arbitrary backend error into the store variant.
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
