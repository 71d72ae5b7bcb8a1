//! The authentication workflow — register, login, logout, change password.
//!
//! One invocation handles one inbound action and runs to a single
//! [`Outcome`]; there is no cancellation concept. The function keeps no
//! state of its own — the only mutation is the caller-owned [`Session`].

use serde::Deserialize;

use crate::{
  error::{AuthError, Error, StoreError},
  hasher,
  session::Session,
  store::{CredentialStore, SubjectRegistry},
  subject::{Profile, SubjectView},
};

// ─── Actions ─────────────────────────────────────────────────────────────────

/// The inbound action set. `Index` is the implicit default: no mutation,
/// trivial success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Index,
  RegisterPost,
  LoginPost,
  Logout,
  ChangePasswordForm,
  ChangePasswordPost,
  ChangePasswordDone,
}

impl Action {
  /// The resolved action name, recorded into session transient state.
  pub fn name(self) -> &'static str {
    match self {
      Self::Index => "action_index",
      Self::RegisterPost => "action_register_post",
      Self::LoginPost => "action_login_post",
      Self::Logout => "action_logout",
      Self::ChangePasswordForm => "action_change_password",
      Self::ChangePasswordPost => "action_change_password_post",
      Self::ChangePasswordDone => "action_change_password_done",
    }
  }

  /// Actions reachable only with an authenticated session.
  fn requires_login(self) -> bool {
    matches!(
      self,
      Self::ChangePasswordForm | Self::ChangePasswordPost | Self::ChangePasswordDone
    )
  }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Form-encoded input fields. Hyphenated names follow the wire format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionInput {
  #[serde(default)]
  pub username:        Option<String>,
  #[serde(default)]
  pub password:        Option<String>,
  #[serde(default)]
  pub first_name:      Option<String>,
  #[serde(default, rename = "retype-password")]
  pub retype_password: Option<String>,
  #[serde(default, rename = "old-password")]
  pub old_password:    Option<String>,
  #[serde(default, rename = "new-password")]
  pub new_password:    Option<String>,
  /// The originally requested path, carried into the login redirect as the
  /// `cp` query parameter. Filled by the transport layer, not a form field.
  #[serde(skip)]
  pub requested_path:  String,
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The structured result of one workflow invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
  /// Success. Registration exposes the created subject with its profile.
  Ok { subject: Option<SubjectView> },
  /// Control-flow redirect — distinct from the failure taxonomy.
  Redirect { location: String },
  /// A terminal request-scoped failure with a caller-visible message.
  Failed(AuthError),
}

// ─── Execute ─────────────────────────────────────────────────────────────────

/// Run one action to its outcome.
///
/// Domain failures come back as [`Outcome::Failed`]; only infrastructure
/// faults (the stores themselves erroring) surface as `Err`.
pub async fn execute<R, C>(
  action: Action,
  input: ActionInput,
  registry: &R,
  credentials: &C,
  session: &mut Session,
) -> Result<Outcome, Error>
where
  R: SubjectRegistry,
  C: CredentialStore,
{
  session.set_state("full_action_name", action.name().into());

  // Account-password actions redirect back through login, carrying the
  // originally requested destination.
  if action.requires_login() && !session.logged_in {
    return Ok(Outcome::Redirect {
      location: format!("/login?cp={}", input.requested_path),
    });
  }

  match action {
    Action::Index | Action::ChangePasswordForm => Ok(Outcome::Ok { subject: None }),
    Action::RegisterPost => register(input, registry).await,
    Action::LoginPost => login(input, credentials, session).await,
    Action::Logout => {
      session.clear();
      Ok(Outcome::Ok { subject: None })
    }
    Action::ChangePasswordPost => change_password(input, credentials, session).await,
    Action::ChangePasswordDone => {
      // Finalize: a completed password change invalidates the session,
      // forcing re-authentication.
      session.clear();
      Ok(Outcome::Ok { subject: None })
    }
  }
}

// ─── Flows ───────────────────────────────────────────────────────────────────

async fn register<R>(input: ActionInput, registry: &R) -> Result<Outcome, Error>
where
  R: SubjectRegistry,
{
  let username = input.username.unwrap_or_default();
  let password = input.password.unwrap_or_default();

  // Checked before any subject exists.
  if let Some(retype) = &input.retype_password
    && retype != &password
  {
    return Ok(Outcome::Failed(AuthError::RetypeMismatch));
  }

  let first_name = match input.first_name {
    Some(name) if !name.is_empty() => name,
    _ => username.clone(),
  };

  let hash_name = username.clone();
  let created = registry
    .create_subject(Profile { first_name }, username.clone(), move |subject_id| {
      hasher::derive(subject_id, &hash_name, &password)
    })
    .await;

  match created {
    Ok(view) => Ok(Outcome::Ok { subject: Some(view) }),
    Err(StoreError::DuplicateIdentifier(_)) => {
      Ok(Outcome::Failed(AuthError::DuplicateIdentifier(username)))
    }
    Err(StoreError::Backend(e)) => Err(Error::store(e)),
  }
}

async fn login<C>(
  input: ActionInput,
  credentials: &C,
  session: &mut Session,
) -> Result<Outcome, Error>
where
  C: CredentialStore,
{
  let username = input.username.unwrap_or_default();
  let password = input.password.unwrap_or_default();

  let Some(record) = credentials
    .find_by_name(username)
    .await
    .map_err(Error::store)?
  else {
    return Ok(Outcome::Failed(AuthError::IdentifierNotFound));
  };

  if !hasher::verify(&record, &password) {
    return Ok(Outcome::Failed(AuthError::PasswordMismatch));
  }

  session.authenticate(record.user_id);
  Ok(Outcome::Ok { subject: None })
}

async fn change_password<C>(
  input: ActionInput,
  credentials: &C,
  session: &mut Session,
) -> Result<Outcome, Error>
where
  C: CredentialStore,
{
  let old_password = input.old_password.unwrap_or_default();
  let new_password = input.new_password.unwrap_or_default();

  // Validation order is observable and load-bearing: existence, then
  // old-password, then same-password, then retype, then commit.
  let record = match session.user_id {
    Some(user_id) => credentials
      .find_by_subject(user_id)
      .await
      .map_err(Error::store)?,
    None => None,
  };
  let Some(record) = record else {
    return Ok(Outcome::Failed(AuthError::NoIdentifierForSubject));
  };

  if !hasher::verify(&record, &old_password) {
    return Ok(Outcome::Failed(AuthError::OldPasswordMismatch));
  }

  if new_password == old_password {
    return Ok(Outcome::Failed(AuthError::SamePassword));
  }

  if let Some(retype) = &input.retype_password
    && retype != &new_password
  {
    return Ok(Outcome::Failed(AuthError::RetypeMismatch));
  }

  let new_hash = hasher::derive(record.user_id, &record.name, &new_password);
  credentials
    .update_hash(record, new_hash)
    .await
    .map_err(Error::store)?;

  Ok(Outcome::Redirect {
    location: "/account/password/changed".to_string(),
  })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, sync::Mutex};

  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::{
    credential::IdentifierRecord,
    subject::{Subject, SubjectId},
  };

  // A minimal in-memory store implementing both traits for workflow tests.
  #[derive(Default)]
  struct MemoryStore {
    subjects:    Mutex<HashMap<SubjectId, SubjectView>>,
    identifiers: Mutex<Vec<IdentifierRecord>>,
  }

  #[derive(Debug, thiserror::Error)]
  #[error("memory store error")]
  struct MemoryError;

  impl SubjectRegistry for MemoryStore {
    type Error = MemoryError;

    async fn create_subject<F>(
      &self,
      profile: Profile,
      identifier_name: String,
      hash_with: F,
    ) -> Result<SubjectView, StoreError<MemoryError>>
    where
      F: FnOnce(SubjectId) -> String + Send + 'static,
    {
      let mut identifiers = self.identifiers.lock().unwrap();
      if identifiers.iter().any(|r| r.name == identifier_name) {
        return Err(StoreError::DuplicateIdentifier(identifier_name));
      }
      let subject_id = Uuid::new_v4();
      let view = SubjectView {
        subject: Subject { subject_id, created_at: Utc::now() },
        profile,
      };
      identifiers.push(IdentifierRecord {
        name:    identifier_name,
        hash:    hash_with(subject_id),
        user_id: subject_id,
      });
      self.subjects.lock().unwrap().insert(subject_id, view.clone());
      Ok(view)
    }

    async fn get_subject(
      &self,
      id: SubjectId,
    ) -> Result<Option<SubjectView>, MemoryError> {
      Ok(self.subjects.lock().unwrap().get(&id).cloned())
    }
  }

  impl CredentialStore for MemoryStore {
    type Error = MemoryError;

    async fn create(
      &self,
      name: String,
      hash: String,
      user_id: SubjectId,
    ) -> Result<IdentifierRecord, StoreError<MemoryError>> {
      let mut identifiers = self.identifiers.lock().unwrap();
      if identifiers.iter().any(|r| r.name == name) {
        return Err(StoreError::DuplicateIdentifier(name));
      }
      let record = IdentifierRecord { name, hash, user_id };
      identifiers.push(record.clone());
      Ok(record)
    }

    async fn find_by_name(
      &self,
      name: String,
    ) -> Result<Option<IdentifierRecord>, MemoryError> {
      Ok(
        self
          .identifiers
          .lock()
          .unwrap()
          .iter()
          .find(|r| r.name == name)
          .cloned(),
      )
    }

    async fn find_by_subject(
      &self,
      user_id: SubjectId,
    ) -> Result<Option<IdentifierRecord>, MemoryError> {
      Ok(
        self
          .identifiers
          .lock()
          .unwrap()
          .iter()
          .find(|r| r.user_id == user_id)
          .cloned(),
      )
    }

    async fn update_hash(
      &self,
      record: IdentifierRecord,
      new_hash: String,
    ) -> Result<(), MemoryError> {
      let mut identifiers = self.identifiers.lock().unwrap();
      if let Some(r) = identifiers.iter_mut().find(|r| r.name == record.name) {
        r.hash = new_hash;
      }
      Ok(())
    }
  }

  fn form(pairs: &[(&str, &str)]) -> ActionInput {
    let mut input = ActionInput::default();
    for (key, value) in pairs {
      let value = Some(value.to_string());
      match *key {
        "username" => input.username = value,
        "password" => input.password = value,
        "first_name" => input.first_name = value,
        "retype-password" => input.retype_password = value,
        "old-password" => input.old_password = value,
        "new-password" => input.new_password = value,
        other => panic!("unknown form field: {other}"),
      }
    }
    input
  }

  async fn run(
    store: &MemoryStore,
    action: Action,
    input: ActionInput,
    session: &mut Session,
  ) -> Outcome {
    execute(action, input, store, store, session).await.unwrap()
  }

  fn failure(outcome: &Outcome) -> &AuthError {
    match outcome {
      Outcome::Failed(e) => e,
      other => panic!("expected failure, got {other:?}"),
    }
  }

  async fn register_user(store: &MemoryStore, username: &str, password: &str) -> SubjectView {
    let mut session = Session::new();
    let outcome = run(
      store,
      Action::RegisterPost,
      form(&[("username", username), ("password", password)]),
      &mut session,
    )
    .await;
    match outcome {
      Outcome::Ok { subject: Some(view) } => view,
      other => panic!("registration failed: {other:?}"),
    }
  }

  // ── Index ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn index_is_trivial_success_and_records_action_name() {
    let store = MemoryStore::default();
    let mut session = Session::new();

    let outcome = run(&store, Action::Index, ActionInput::default(), &mut session).await;
    assert!(matches!(outcome, Outcome::Ok { subject: None }));
    assert_eq!(
      session.state("full_action_name").and_then(|v| v.as_str()),
      Some("action_index")
    );
  }

  // ── Registration ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_creates_subject_and_stores_derived_hash() {
    let store = MemoryStore::default();
    let view = register_user(&store, "alice", "hello").await;

    assert_eq!(view.profile.first_name, "alice");

    let record = store.find_by_name("alice".into()).await.unwrap().unwrap();
    assert_eq!(record.name, "alice");
    assert_eq!(record.user_id, view.subject.subject_id);
    assert_eq!(
      record.hash,
      hasher::derive(view.subject.subject_id, "alice", "hello")
    );
  }

  #[tokio::test]
  async fn register_with_explicit_first_name() {
    let store = MemoryStore::default();
    let mut session = Session::new();

    let outcome = run(
      &store,
      Action::RegisterPost,
      form(&[
        ("first_name", "Alice Lee"),
        ("username", "alice2"),
        ("password", "hello"),
      ]),
      &mut session,
    )
    .await;

    match outcome {
      Outcome::Ok { subject: Some(view) } => {
        assert_eq!(view.profile.first_name, "Alice Lee");
      }
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[tokio::test]
  async fn register_duplicate_username_fails_with_exact_message() {
    let store = MemoryStore::default();
    register_user(&store, "bob", "hello").await;

    let mut session = Session::new();
    let outcome = run(
      &store,
      Action::RegisterPost,
      form(&[("username", "bob"), ("password", "other")]),
      &mut session,
    )
    .await;

    let err = failure(&outcome);
    assert_eq!(*err, AuthError::DuplicateIdentifier("bob".into()));
    assert_eq!(err.to_string(), "User Name bob already in use.");

    // Still exactly one record with that name.
    assert_eq!(store.identifiers.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn register_with_matching_retype_succeeds() {
    let store = MemoryStore::default();
    let mut session = Session::new();

    let outcome = run(
      &store,
      Action::RegisterPost,
      form(&[
        ("username", "bob2"),
        ("password", "hello"),
        ("retype-password", "hello"),
      ]),
      &mut session,
    )
    .await;
    assert!(matches!(outcome, Outcome::Ok { subject: Some(_) }));
  }

  #[tokio::test]
  async fn register_retype_mismatch_commits_nothing() {
    let store = MemoryStore::default();
    let mut session = Session::new();

    let outcome = run(
      &store,
      Action::RegisterPost,
      form(&[
        ("username", "bob3"),
        ("password", "hello"),
        ("retype-password", "helo"),
      ]),
      &mut session,
    )
    .await;

    assert_eq!(failure(&outcome).to_string(), "Retype password mismatch");
    assert!(store.find_by_name("bob3".into()).await.unwrap().is_none());
    assert!(store.subjects.lock().unwrap().is_empty());
  }

  // ── Login ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn login_with_correct_credentials_authenticates_session() {
    let store = MemoryStore::default();
    let view = register_user(&store, "charlie", "wow").await;

    let mut session = Session::new();
    let outcome = run(
      &store,
      Action::LoginPost,
      form(&[("username", "charlie"), ("password", "wow")]),
      &mut session,
    )
    .await;

    assert!(matches!(outcome, Outcome::Ok { .. }));
    assert!(session.logged_in);
    assert_eq!(session.user_id, Some(view.subject.subject_id));
  }

  #[tokio::test]
  async fn login_with_wrong_password_fails() {
    let store = MemoryStore::default();
    register_user(&store, "charlie2", "wow").await;

    let mut session = Session::new();
    let outcome = run(
      &store,
      Action::LoginPost,
      form(&[("username", "charlie2"), ("password", "boom")]),
      &mut session,
    )
    .await;

    assert_eq!(failure(&outcome).to_string(), "Password Mismatch");
    assert!(!session.logged_in);
  }

  #[tokio::test]
  async fn login_with_unknown_username_fails() {
    let store = MemoryStore::default();

    let mut session = Session::new();
    let outcome = run(
      &store,
      Action::LoginPost,
      form(&[("username", "charlie99"), ("password", "boom")]),
      &mut session,
    )
    .await;

    assert_eq!(failure(&outcome).to_string(), "Identifier not found");
  }

  // ── Logout ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn logout_clears_session_regardless_of_prior_state() {
    let store = MemoryStore::default();
    register_user(&store, "lucky", "hello").await;

    let mut session = Session::new();
    run(
      &store,
      Action::LoginPost,
      form(&[("username", "lucky"), ("password", "hello")]),
      &mut session,
    )
    .await;
    assert!(session.logged_in);

    run(&store, Action::Logout, ActionInput::default(), &mut session).await;
    assert!(!session.logged_in);
    assert_eq!(session.user_id, None);

    // Logging out an already-logged-out session is a no-op.
    run(&store, Action::Logout, ActionInput::default(), &mut session).await;
    assert!(!session.logged_in);
    assert_eq!(session.user_id, None);
  }

  // ── Change password ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn change_password_without_login_redirects_to_login() {
    let store = MemoryStore::default();
    let mut session = Session::new();

    let mut input = ActionInput::default();
    input.requested_path = "test".to_string();

    let outcome = run(&store, Action::ChangePasswordForm, input, &mut session).await;
    match outcome {
      Outcome::Redirect { location } => assert_eq!(location, "/login?cp=test"),
      other => panic!("expected redirect, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn change_password_happy_path_updates_hash_and_redirects() {
    let store = MemoryStore::default();
    register_user(&store, "eve", "hello").await;

    let mut session = Session::new();
    run(
      &store,
      Action::LoginPost,
      form(&[("username", "eve"), ("password", "hello")]),
      &mut session,
    )
    .await;

    let outcome = run(
      &store,
      Action::ChangePasswordPost,
      form(&[("old-password", "hello"), ("new-password", "somesome")]),
      &mut session,
    )
    .await;
    match outcome {
      Outcome::Redirect { location } => {
        assert_eq!(location, "/account/password/changed");
      }
      other => panic!("expected redirect, got {other:?}"),
    }

    let record = store.find_by_name("eve".into()).await.unwrap().unwrap();
    assert!(hasher::verify(&record, "somesome"));
    assert!(!hasher::verify(&record, "hello"));
  }

  #[tokio::test]
  async fn change_password_with_matching_retype_succeeds() {
    let store = MemoryStore::default();
    register_user(&store, "eve2", "somesome").await;

    let mut session = Session::new();
    run(
      &store,
      Action::LoginPost,
      form(&[("username", "eve2"), ("password", "somesome")]),
      &mut session,
    )
    .await;

    let outcome = run(
      &store,
      Action::ChangePasswordPost,
      form(&[
        ("old-password", "somesome"),
        ("new-password", "hello"),
        ("retype-password", "hello"),
      ]),
      &mut session,
    )
    .await;
    assert!(matches!(outcome, Outcome::Redirect { .. }));
  }

  #[tokio::test]
  async fn change_password_failure_order_is_observable() {
    let store = MemoryStore::default();
    register_user(&store, "frank", "hello").await;

    let mut session = Session::new();
    run(
      &store,
      Action::LoginPost,
      form(&[("username", "frank"), ("password", "hello")]),
      &mut session,
    )
    .await;

    // Existence check comes first: a session pointing at an unknown
    // subject fails before any password comparison.
    let mut orphan = session.clone();
    orphan.user_id = Some(Uuid::new_v4());
    let outcome = run(
      &store,
      Action::ChangePasswordPost,
      form(&[("old-password", "hello"), ("new-password", "somesome")]),
      &mut orphan,
    )
    .await;
    assert_eq!(
      failure(&outcome).to_string(),
      "No Password Identifier associate to this user."
    );

    // Old-password verification precedes the same-password check.
    let outcome = run(
      &store,
      Action::ChangePasswordPost,
      form(&[("old-password", "hehe"), ("new-password", "hehe")]),
      &mut session,
    )
    .await;
    assert_eq!(failure(&outcome).to_string(), "Old Password Mismatch");

    // Same-password check precedes the retype check.
    let outcome = run(
      &store,
      Action::ChangePasswordPost,
      form(&[
        ("old-password", "hello"),
        ("new-password", "hello"),
        ("retype-password", "nope"),
      ]),
      &mut session,
    )
    .await;
    assert_eq!(
      failure(&outcome).to_string(),
      "New password is same as old password"
    );

    // Retype check happens before the update is committed.
    let outcome = run(
      &store,
      Action::ChangePasswordPost,
      form(&[
        ("old-password", "hello"),
        ("new-password", "somesome"),
        ("retype-password", "some"),
      ]),
      &mut session,
    )
    .await;
    assert_eq!(failure(&outcome).to_string(), "Retype password mismatch");

    let record = store.find_by_name("frank".into()).await.unwrap().unwrap();
    assert!(hasher::verify(&record, "hello"), "no partial commit");
  }

  #[tokio::test]
  async fn change_password_done_invalidates_session() {
    let store = MemoryStore::default();
    register_user(&store, "grace", "hello").await;

    let mut session = Session::new();
    run(
      &store,
      Action::LoginPost,
      form(&[("username", "grace"), ("password", "hello")]),
      &mut session,
    )
    .await;
    assert!(session.logged_in);

    let outcome = run(
      &store,
      Action::ChangePasswordDone,
      ActionInput::default(),
      &mut session,
    )
    .await;
    assert!(matches!(outcome, Outcome::Ok { .. }));
    assert!(!session.logged_in);
  }
}
