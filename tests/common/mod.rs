// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::response::Response;
use leaderboard_server::config::Config;
use leaderboard_server::db::EntryStore;
use leaderboard_server::models::UserIdentity;
use leaderboard_server::routes::create_router;
use leaderboard_server::services::session::SessionRecord;
use leaderboard_server::services::{
    GoogleOAuth, MemorySessionBackend, SessionBackend, SessionError, SessionStore,
    SESSION_COOKIE,
};
use leaderboard_server::AppState;
use std::sync::Arc;

/// Create an in-memory entry store.
#[allow(dead_code)]
pub async fn test_entries() -> EntryStore {
    EntryStore::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database")
}

/// Build a router around the given dependencies.
#[allow(dead_code)]
pub fn build_app(
    config: Config,
    entries: EntryStore,
    sessions: SessionStore,
    oauth: GoogleOAuth,
) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config,
        entries,
        sessions,
        oauth,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with an in-memory database and session store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let oauth = GoogleOAuth::new(&config).expect("Failed to build OAuth client");
    build_app(
        config,
        test_entries().await,
        SessionStore::in_memory(false),
        oauth,
    )
}

#[allow(dead_code)]
pub fn test_identity() -> UserIdentity {
    UserIdentity {
        email: "alice@example.com".to_string(),
        name: "Alice Example".to_string(),
    }
}

/// Store a session bound to `identity` and return a `Cookie` header value.
#[allow(dead_code)]
pub fn login_cookie(state: &AppState, identity: UserIdentity) -> String {
    let mut session = state.sessions.load_by_id(None).unwrap();
    session.set_identity(identity);
    state.sessions.save(&mut session).unwrap();
    format!("{}={}", SESSION_COOKIE, session.id())
}

/// Store a session with no identity and return a `Cookie` header value.
#[allow(dead_code)]
pub fn anonymous_cookie(state: &AppState) -> String {
    let mut session = state.sessions.load_by_id(None).unwrap();
    state.sessions.save(&mut session).unwrap();
    format!("{}={}", SESSION_COOKIE, session.id())
}

/// Extract the session cookie (`name=value`) from a response, if set.
#[allow(dead_code)]
pub fn session_cookie_from(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string())
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Session backend whose every operation fails.
#[allow(dead_code)]
pub struct FailingSessionBackend;

impl SessionBackend for FailingSessionBackend {
    fn load(&self, _id: &str) -> Result<Option<SessionRecord>, SessionError> {
        Err(SessionError::Persistence("backend unavailable".to_string()))
    }

    fn store(&self, _id: &str, _record: &SessionRecord) -> Result<(), SessionError> {
        Err(SessionError::Persistence("backend unavailable".to_string()))
    }

    fn remove(&self, _id: &str) -> Result<(), SessionError> {
        Err(SessionError::Persistence("backend unavailable".to_string()))
    }

    fn purge_expired(&self, _now: chrono::DateTime<chrono::Utc>) -> Result<usize, SessionError> {
        Err(SessionError::Persistence("backend unavailable".to_string()))
    }
}

/// In-memory backend that refuses to store a record carrying an identity,
/// so logins fail at the final save while pending-login saves succeed.
#[allow(dead_code)]
#[derive(Default)]
pub struct IdentityRejectingBackend {
    inner: MemorySessionBackend,
}

impl SessionBackend for IdentityRejectingBackend {
    fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
        self.inner.load(id)
    }

    fn store(&self, id: &str, record: &SessionRecord) -> Result<(), SessionError> {
        if record.data.identity.is_some() {
            return Err(SessionError::Persistence("write rejected".to_string()));
        }
        self.inner.store(id, record)
    }

    fn remove(&self, id: &str) -> Result<(), SessionError> {
        self.inner.remove(id)
    }

    fn purge_expired(&self, now: chrono::DateTime<chrono::Utc>) -> Result<usize, SessionError> {
        self.inner.purge_expired(now)
    }
}
