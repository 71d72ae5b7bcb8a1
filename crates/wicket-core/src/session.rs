//! Per-request session state.

use std::collections::HashMap;

use serde_json::Value;

use crate::subject::SubjectId;

/// Mutable per-requester session state.
///
/// Each request owns its own session reference; the workflow mutates it in
/// place and no cross-request locking is required. Besides the
/// authentication flags, a session carries workflow-scoped transient values
/// (e.g. the last-resolved action name) that are never persisted long-term.
#[derive(Debug, Clone, Default)]
pub struct Session {
  pub logged_in: bool,
  pub user_id:   Option<SubjectId>,
  state:         HashMap<String, Value>,
}

impl Session {
  pub fn new() -> Self { Self::default() }

  /// Mark the session authenticated as `user_id`.
  pub fn authenticate(&mut self, user_id: SubjectId) {
    self.logged_in = true;
    self.user_id = Some(user_id);
  }

  /// Drop authentication. Idempotent: clearing an already-cleared session
  /// yields the same state.
  pub fn clear(&mut self) {
    self.logged_in = false;
    self.user_id = None;
  }

  /// Set a transient workflow-scoped value.
  pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
    self.state.insert(key.into(), value);
  }

  /// Read a transient workflow-scoped value.
  pub fn state(&self, key: &str) -> Option<&Value> { self.state.get(key) }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn authenticate_then_clear() {
    let mut session = Session::new();
    assert!(!session.logged_in);

    let id = Uuid::new_v4();
    session.authenticate(id);
    assert!(session.logged_in);
    assert_eq!(session.user_id, Some(id));

    session.clear();
    assert!(!session.logged_in);
    assert_eq!(session.user_id, None);

    // Idempotent.
    session.clear();
    assert!(!session.logged_in);
  }

  #[test]
  fn transient_state_round_trip() {
    let mut session = Session::new();
    session.set_state("full_action_name", "action_index".into());
    assert_eq!(
      session.state("full_action_name").and_then(Value::as_str),
      Some("action_index")
    );
    assert!(session.state("missing").is_none());
  }
}
