// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard server: a score-ranked leaderboard behind Google sign-in.
//!
//! Reads require a server-side session established through Google OAuth;
//! writes require a shared API key.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod services;

use config::Config;
use db::EntryStore;
use services::{GoogleOAuth, SessionStore};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub entries: EntryStore,
    pub sessions: SessionStore,
    pub oauth: GoogleOAuth,
}
