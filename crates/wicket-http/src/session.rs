//! Cookie-token session tracking.
//!
//! Tokens are uuid v4 strings carried in a cookie; the sessions themselves
//! live in process memory behind a [`RwLock`]. Entries are stamped with an
//! expiry on every save and reaped by a periodic cleanup task, so the map
//! cannot grow without bound.

use std::{
  collections::HashMap,
  sync::Arc,
  time::{Duration, SystemTime},
};

use axum::http::{HeaderMap, header};
use tokio::sync::RwLock;
use uuid::Uuid;
use wicket_core::session::Session;

/// Session TTL (time to live).
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

struct Entry {
  session:    Session,
  expires_at: SystemTime,
}

/// In-memory session store keyed by cookie token.
#[derive(Clone)]
pub struct SessionManager {
  sessions: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionManager {
  /// Create a manager and spawn its periodic cleanup task.
  pub fn new() -> Self {
    let manager = SessionManager {
      sessions: Arc::new(RwLock::new(HashMap::new())),
    };

    let manager_clone = manager.clone();
    tokio::spawn(async move {
      manager_clone.cleanup_task().await;
    });

    manager
  }

  /// Resolve the session for `token`, minting a fresh token when the
  /// presented one is absent, unknown, or expired.
  pub async fn load(&self, token: Option<&str>) -> (String, Session) {
    if let Some(token) = token {
      let sessions = self.sessions.read().await;
      if let Some(entry) = sessions.get(token)
        && SystemTime::now() < entry.expires_at
      {
        return (token.to_string(), entry.session.clone());
      }
    }
    (Uuid::new_v4().to_string(), Session::new())
  }

  /// Persist `session` under `token`, refreshing its expiry.
  pub async fn save(&self, token: String, session: Session) {
    let entry = Entry {
      session,
      expires_at: SystemTime::now() + SESSION_TTL,
    };
    self.sessions.write().await.insert(token, entry);
  }

  /// Remove the entry for `token`, if any.
  pub async fn evict(&self, token: &str) {
    self.sessions.write().await.remove(token);
  }

  /// Periodically drop entries whose expiry has passed.
  async fn cleanup_task(&self) {
    loop {
      tokio::time::sleep(CLEANUP_INTERVAL).await;

      let mut sessions = self.sessions.write().await;
      let now = SystemTime::now();
      let before = sessions.len();
      sessions.retain(|_, entry| now < entry.expires_at);

      let removed = before - sessions.len();
      if removed > 0 {
        tracing::debug!(removed, "evicted expired sessions");
      }
    }
  }

  #[cfg(test)]
  pub(crate) async fn save_expiring(
    &self,
    token: String,
    session: Session,
    expires_at: SystemTime,
  ) {
    let entry = Entry { session, expires_at };
    self.sessions.write().await.insert(token, entry);
  }

  #[cfg(test)]
  pub(crate) async fn len(&self) -> usize {
    self.sessions.read().await.len()
  }
}

/// Extract the named cookie's value from the request headers.
pub fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
  let raw = headers.get(header::COOKIE)?.to_str().ok()?;
  raw.split(';').find_map(|pair| {
    let (key, value) = pair.trim().split_once('=')?;
    (key == name).then(|| value.to_string())
  })
}

/// Build the `Set-Cookie` value binding `token` to the session cookie.
/// The cookie lifetime matches the server-side session TTL.
pub fn set_cookie(name: &str, token: &str) -> String {
  format!(
    "{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
    SESSION_TTL.as_secs()
  )
}
