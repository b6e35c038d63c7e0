// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware for read routes.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Middleware that requires a session with a bound identity.
///
/// On success the [`UserIdentity`](crate::models::UserIdentity) is inserted
/// into request extensions. Tokens are never exchanged or refreshed here.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = state.sessions.load(&jar)?;

    let identity = session
        .identity()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("No user info found in session".to_string()))?;

    tracing::debug!(email = %identity.email, "Session authenticated");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
