// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - OAuth and session handling.

pub mod google_oauth;
pub mod session;

pub use google_oauth::{GoogleOAuth, OAuthEndpoints, OAuthError, OAuthToken};
pub use session::{
    MemorySessionBackend, Session, SessionBackend, SessionError, SessionStore,
    PENDING_LOGIN_TTL_MINUTES, SESSION_COOKIE,
};
