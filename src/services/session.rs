// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side sessions keyed by an opaque cookie.
//!
//! The cookie carries only a random identifier; the session record itself
//! (expiry plus a typed payload) lives in a [`SessionBackend`]. Expiry is
//! fixed when the session is created and is never extended by activity.
//! A session that only carries a pending login is kept for
//! [`PENDING_LOGIN_TTL_MINUTES`]; binding an identity rotates it onto the
//! full [`SESSION_TTL_HOURS`] lifetime.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};

use crate::models::UserIdentity;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sessionid";
/// Session lifetime from creation.
pub const SESSION_TTL_HOURS: i64 = 24;
/// Lifetime of an anonymous session holding only a pending login state.
pub const PENDING_LOGIN_TTL_MINUTES: i64 = 10;
/// Minimum time between sweeps of expired records.
pub const PURGE_INTERVAL_SECS: i64 = 60;

const TOKEN_BYTES: usize = 32;

/// Session store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The backend failed to read or write a record.
    #[error("Failed to persist session: {0}")]
    Persistence(String),

    /// The OS random source failed.
    #[error("Failed to generate random token")]
    Random,
}

/// Typed session payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    /// Identity bound by a completed login.
    pub identity: Option<UserIdentity>,
    /// Anti-forgery state of a login that has been started but not completed.
    pub oauth_state: Option<String>,
}

/// Stored session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub expires_at: DateTime<Utc>,
    pub data: SessionData,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Storage for session records.
pub trait SessionBackend: Send + Sync {
    fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionError>;
    fn store(&self, id: &str, record: &SessionRecord) -> Result<(), SessionError>;
    fn remove(&self, id: &str) -> Result<(), SessionError>;
    /// Drop every record expired at `now`, returning how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError>;
}

/// In-process session backend.
#[derive(Default)]
pub struct MemorySessionBackend {
    records: DashMap<String, SessionRecord>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionBackend for MemorySessionBackend {
    fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    fn store(&self, id: &str, record: &SessionRecord) -> Result<(), SessionError> {
        self.records.insert(id.to_string(), record.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), SessionError> {
        self.records.remove(id);
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        Ok(before.saturating_sub(self.records.len()))
    }
}

/// A loaded (or freshly allocated) session.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    record: SessionRecord,
    is_new: bool,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.record.expires_at
    }

    /// True until the session has been saved once.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.record.data.identity.as_ref()
    }

    /// Bind an identity, replacing any previous one.
    pub fn set_identity(&mut self, identity: UserIdentity) {
        self.record.data.identity = Some(identity);
    }

    /// Remove and return the pending login state.
    pub fn take_oauth_state(&mut self) -> Option<String> {
        self.record.data.oauth_state.take()
    }
}

/// Session store.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    rng: SystemRandom,
    ttl: Duration,
    pending_ttl: Duration,
    // Unix seconds of the last expired-record sweep.
    last_purge: Arc<AtomicI64>,
    cookie_secure: bool,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>, cookie_secure: bool) -> Self {
        Self {
            backend,
            rng: SystemRandom::new(),
            ttl: Duration::hours(SESSION_TTL_HOURS),
            pending_ttl: Duration::minutes(PENDING_LOGIN_TTL_MINUTES),
            last_purge: Arc::new(AtomicI64::new(0)),
            cookie_secure,
        }
    }

    /// Store backed by an in-process map.
    pub fn in_memory(cookie_secure: bool) -> Self {
        Self::new(Arc::new(MemorySessionBackend::new()), cookie_secure)
    }

    /// Load the session named by the request's cookie, or allocate a new
    /// one if the cookie is absent, unknown or expired.
    ///
    /// A new session is not stored until [`SessionStore::save`] is called.
    pub fn load(&self, jar: &CookieJar) -> Result<Session, SessionError> {
        self.load_by_id(jar.get(SESSION_COOKIE).map(|c| c.value()))
    }

    /// Like [`SessionStore::load`], from a raw cookie value.
    pub fn load_by_id(&self, cookie_value: Option<&str>) -> Result<Session, SessionError> {
        let now = Utc::now();

        if let Some(id) = cookie_value.filter(|v| !v.is_empty()) {
            match self.backend.load(id)? {
                Some(record) if !record.is_expired(now) => {
                    return Ok(Session {
                        id: id.to_string(),
                        record,
                        is_new: false,
                    });
                }
                Some(_) => {
                    tracing::debug!("Session expired, discarding");
                    self.backend.remove(id)?;
                }
                None => {}
            }
        }

        self.allocate(now)
    }

    /// Record a pending login state on the session.
    ///
    /// An anonymous session is cut down to the short pending-login lifetime,
    /// so abandoned logins do not hold a record for a full day.
    pub fn begin_login(&self, session: &mut Session, state: String) {
        session.record.data.oauth_state = Some(state);
        if session.identity().is_none() {
            let pending_expiry = Utc::now() + self.pending_ttl;
            if pending_expiry < session.record.expires_at {
                session.record.expires_at = pending_expiry;
            }
        }
    }

    /// Write the session through to the backend.
    pub fn save(&self, session: &mut Session) -> Result<(), SessionError> {
        self.backend.store(&session.id, &session.record)?;
        session.is_new = false;
        Ok(())
    }

    /// Move the session onto a fresh identifier and expiry, dropping the old
    /// record. The payload is kept. The caller must save afterwards.
    pub fn regenerate(&self, session: &mut Session) -> Result<(), SessionError> {
        if !session.is_new {
            self.backend.remove(&session.id)?;
        }
        let fresh = self.allocate(Utc::now())?;
        session.id = fresh.id;
        session.record.expires_at = fresh.record.expires_at;
        session.is_new = true;
        Ok(())
    }

    /// Delete the session record.
    pub fn destroy(&self, session: &Session) -> Result<(), SessionError> {
        self.backend.remove(&session.id)
    }

    /// Cookie naming this session, valid for its remaining lifetime.
    pub fn cookie(&self, session: &Session) -> Cookie<'static> {
        let remaining = (session.record.expires_at - Utc::now()).num_seconds().max(0);
        Cookie::build((SESSION_COOKIE, session.id.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(time::Duration::seconds(remaining))
            .build()
    }

    /// Cookie that clears the session cookie in the browser.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(time::Duration::ZERO)
            .build()
    }

    /// Random URL-safe token (256 bits).
    pub fn generate_token(&self) -> Result<String, SessionError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| SessionError::Random)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    fn allocate(&self, now: DateTime<Utc>) -> Result<Session, SessionError> {
        self.maybe_purge(now)?;

        Ok(Session {
            id: self.generate_token()?,
            record: SessionRecord {
                expires_at: now + self.ttl,
                data: SessionData::default(),
            },
            is_new: true,
        })
    }

    /// Sweep expired records at most once per [`PURGE_INTERVAL_SECS`].
    fn maybe_purge(&self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let now_secs = now.timestamp();
        let last = self.last_purge.load(Ordering::Relaxed);
        if now_secs - last < PURGE_INTERVAL_SECS {
            return Ok(());
        }
        // Only the caller that wins the exchange sweeps.
        if self
            .last_purge
            .compare_exchange(last, now_secs, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return Ok(());
        }

        let purged = self.backend.purge_expired(now)?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
        }
    }

    #[test]
    fn test_new_session_without_cookie() {
        let store = SessionStore::in_memory(false);
        let session = store.load_by_id(None).unwrap();

        assert!(session.is_new());
        assert!(session.identity().is_none());
        let ttl = session.expires_at() - Utc::now();
        assert!(ttl > Duration::hours(23) && ttl <= Duration::hours(24));
    }

    #[test]
    fn test_unsaved_session_is_not_found_later() {
        let store = SessionStore::in_memory(false);
        let session = store.load_by_id(None).unwrap();

        let again = store.load_by_id(Some(session.id())).unwrap();
        assert_ne!(again.id(), session.id());
    }

    #[test]
    fn test_identity_round_trip() {
        let store = SessionStore::in_memory(false);
        let mut session = store.load_by_id(None).unwrap();
        session.set_identity(identity());
        store.save(&mut session).unwrap();
        assert!(!session.is_new());

        let loaded = store.load_by_id(Some(session.id())).unwrap();
        assert_eq!(loaded.id(), session.id());
        assert_eq!(loaded.identity(), Some(&identity()));
        assert_eq!(loaded.expires_at(), session.expires_at());
    }

    #[test]
    fn test_set_identity_overwrites() {
        let store = SessionStore::in_memory(false);
        let mut session = store.load_by_id(None).unwrap();
        session.set_identity(identity());
        let bob = UserIdentity {
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
        };
        session.set_identity(bob.clone());
        assert_eq!(session.identity(), Some(&bob));
    }

    #[test]
    fn test_expired_session_replaced() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = SessionStore::new(backend.clone(), false);

        let expired = SessionRecord {
            expires_at: Utc::now() - Duration::seconds(1),
            data: SessionData {
                identity: Some(identity()),
                oauth_state: None,
            },
        };
        backend.store("stale", &expired).unwrap();

        let session = store.load_by_id(Some("stale")).unwrap();
        assert_ne!(session.id(), "stale");
        assert!(session.identity().is_none());
        assert!(backend.load("stale").unwrap().is_none());
    }

    #[test]
    fn test_new_session_purges_expired() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = SessionStore::new(backend.clone(), false);

        let expired = SessionRecord {
            expires_at: Utc::now() - Duration::hours(1),
            data: SessionData::default(),
        };
        backend.store("a", &expired).unwrap();
        backend.store("b", &expired).unwrap();
        assert_eq!(backend.len(), 2);

        store.load_by_id(None).unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_purge_runs_once_per_interval() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = SessionStore::new(backend.clone(), false);

        // First allocation sweeps (nothing to remove yet).
        store.load_by_id(None).unwrap();

        let expired = SessionRecord {
            expires_at: Utc::now() - Duration::hours(1),
            data: SessionData::default(),
        };
        backend.store("a", &expired).unwrap();

        for _ in 0..10 {
            store.load_by_id(None).unwrap();
        }
        assert_eq!(backend.len(), 1, "swept again inside the interval");

        // Pretend the last sweep was long ago.
        store.last_purge.store(0, Ordering::Relaxed);
        store.load_by_id(None).unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_pending_login_has_short_expiry() {
        let store = SessionStore::in_memory(false);
        let mut session = store.load_by_id(None).unwrap();

        store.begin_login(&mut session, "state".to_string());

        let ttl = session.expires_at() - Utc::now();
        assert!(ttl <= Duration::minutes(PENDING_LOGIN_TTL_MINUTES));
        assert!(ttl > Duration::minutes(PENDING_LOGIN_TTL_MINUTES - 1));
    }

    #[test]
    fn test_pending_login_keeps_signed_in_expiry() {
        let store = SessionStore::in_memory(false);
        let mut session = store.load_by_id(None).unwrap();
        session.set_identity(identity());
        let expires_at = session.expires_at();

        store.begin_login(&mut session, "state".to_string());

        assert_eq!(session.expires_at(), expires_at);
    }

    #[test]
    fn test_regenerate_restores_full_lifetime() {
        let store = SessionStore::in_memory(false);
        let mut session = store.load_by_id(None).unwrap();
        store.begin_login(&mut session, "state".to_string());
        store.save(&mut session).unwrap();

        store.regenerate(&mut session).unwrap();

        let ttl = session.expires_at() - Utc::now();
        assert!(ttl > Duration::hours(SESSION_TTL_HOURS - 1));
    }

    #[test]
    fn test_regenerate_moves_payload() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = SessionStore::new(backend.clone(), false);

        let mut session = store.load_by_id(None).unwrap();
        store.begin_login(&mut session, "xyz".to_string());
        store.save(&mut session).unwrap();
        let old_id = session.id().to_string();

        store.regenerate(&mut session).unwrap();
        session.set_identity(identity());
        store.save(&mut session).unwrap();

        assert_ne!(session.id(), old_id);
        assert!(backend.load(&old_id).unwrap().is_none());
        let loaded = store.load_by_id(Some(session.id())).unwrap();
        assert_eq!(loaded.identity(), Some(&identity()));
    }

    #[test]
    fn test_take_oauth_state_consumes() {
        let store = SessionStore::in_memory(false);
        let mut session = store.load_by_id(None).unwrap();
        store.begin_login(&mut session, "abc".to_string());
        assert_eq!(session.take_oauth_state().as_deref(), Some("abc"));
        assert_eq!(session.take_oauth_state(), None);
    }

    #[test]
    fn test_destroy() {
        let store = SessionStore::in_memory(false);
        let mut session = store.load_by_id(None).unwrap();
        session.set_identity(identity());
        store.save(&mut session).unwrap();

        store.destroy(&session).unwrap();
        let loaded = store.load_by_id(Some(session.id())).unwrap();
        assert!(loaded.identity().is_none());
    }

    #[test]
    fn test_cookie_attributes() {
        let store = SessionStore::in_memory(false);
        let session = store.load_by_id(None).unwrap();
        let cookie = store.cookie(&session).to_string();

        assert!(cookie.starts_with(&format!("{}={}", SESSION_COOKIE, session.id())));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age="));
        assert!(!cookie.contains("Secure"));

        let secure = SessionStore::in_memory(true);
        assert!(secure.cookie(&session).to_string().contains("Secure"));
        assert!(secure.removal_cookie().to_string().contains("Max-Age=0"));
    }

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let store = SessionStore::in_memory(false);
        let a = store.generate_token().unwrap();
        let b = store.generate_token().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
