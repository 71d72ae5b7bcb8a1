//! HTTP front end for the wicket authentication core.
//!
//! Exposes an axum [`Router`] mapping form posts onto the core workflow,
//! backed by any store implementing both core traits.

pub mod session;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Form, Router,
  extract::State,
  http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
  response::{IntoResponse, Json, Response},
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use wicket_core::{
  store::{CredentialStore, SubjectRegistry},
  workflow::{self, Action, ActionInput, Outcome},
};

use session::SessionManager;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  #[serde(default = "default_session_cookie")]
  pub session_cookie: String,
}

fn default_session_cookie() -> String { "wicket_session".to_string() }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub sessions: SessionManager,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the authentication server.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/",                         get(index::<S>))
    .route("/register",                 post(register::<S>))
    .route("/login",                    post(login::<S>))
    .route("/logout",                   get(logout::<S>).post(logout::<S>))
    .route("/account/password",         get(change_password_form::<S>)
                                          .post(change_password_post::<S>))
    .route("/account/password/changed", get(change_password_done::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

/// Run one workflow action for an inbound request and render its outcome.
///
/// The session is resolved from the request cookie, mutated by the
/// workflow, and persisted back (or evicted) before the response is
/// built; the cookie is (re-)set on every response so fresh tokens stick.
async fn run<S>(
  state:     &AppState<S>,
  action:    Action,
  headers:   &HeaderMap,
  path:      &str,
  mut input: ActionInput,
) -> Response
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  input.requested_path = path.to_string();

  let presented = session::cookie_token(headers, &state.config.session_cookie);
  let (token, mut session) = state.sessions.load(presented.as_deref()).await;

  let result = workflow::execute(
    action,
    input,
    &*state.store,
    &*state.store,
    &mut session,
  )
  .await;

  // Only authenticated sessions are worth keeping; anything else (an
  // anonymous hit, a logout, a finalized password change) drops its entry
  // so the map holds one entry per live login, not per request.
  if session.logged_in {
    state.sessions.save(token.clone(), session).await;
  } else {
    state.sessions.evict(&token).await;
  }

  let mut response = match result {
    Ok(Outcome::Ok { subject: Some(view) }) => Json(view).into_response(),
    Ok(Outcome::Ok { subject: None })       => StatusCode::OK.into_response(),
    Ok(Outcome::Redirect { location })      => redirect(&location),
    Ok(Outcome::Failed(err)) => {
      (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
    }
    Err(err) => {
      tracing::error!(%err, action = action.name(), "store failure");
      (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
    }
  };

  let cookie = session::set_cookie(&state.config.session_cookie, &token);
  if let Ok(value) = HeaderValue::from_str(&cookie) {
    response.headers_mut().insert(header::SET_COOKIE, value);
  }
  response
}

fn redirect(location: &str) -> Response {
  let Ok(value) = HeaderValue::from_str(location) else {
    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
  };
  let mut response = StatusCode::FOUND.into_response();
  response.headers_mut().insert(header::LOCATION, value);
  response
}

// ─── Route handlers ───────────────────────────────────────────────────────────

async fn index<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  uri: Uri,
) -> Response
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  run(&state, Action::Index, &headers, uri.path(), ActionInput::default()).await
}

async fn register<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  uri: Uri,
  Form(input): Form<ActionInput>,
) -> Response
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  run(&state, Action::RegisterPost, &headers, uri.path(), input).await
}

async fn login<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  uri: Uri,
  Form(input): Form<ActionInput>,
) -> Response
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  run(&state, Action::LoginPost, &headers, uri.path(), input).await
}

async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  uri: Uri,
) -> Response
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  run(&state, Action::Logout, &headers, uri.path(), ActionInput::default()).await
}

async fn change_password_form<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  uri: Uri,
) -> Response
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  run(
    &state,
    Action::ChangePasswordForm,
    &headers,
    uri.path(),
    ActionInput::default(),
  )
  .await
}

async fn change_password_post<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  uri: Uri,
  Form(input): Form<ActionInput>,
) -> Response
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  run(&state, Action::ChangePasswordPost, &headers, uri.path(), input).await
}

async fn change_password_done<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  uri: Uri,
) -> Response
where
  S: CredentialStore + SubjectRegistry + Clone + Send + Sync + 'static,
{
  run(
    &state,
    Action::ChangePasswordDone,
    &headers,
    uri.path(),
    ActionInput::default(),
  )
  .await
}

// ─── Integration tests ────────────────────────────────────────────────────────
