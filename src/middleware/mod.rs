// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, security, etc.).

pub mod api_key;
pub mod auth;
pub mod security;

pub use api_key::require_api_key;
pub use auth::require_session;
