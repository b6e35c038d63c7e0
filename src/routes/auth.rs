// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth login routes and session identity lookup.

use axum::{
    extract::{Query, State},
    middleware,
    response::Redirect,
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::require_session;
use crate::models::UserIdentity;
use crate::AppState;

/// Page shown after a successful login.
pub const WELCOME_PAGE: &str = "/welcome.html";

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route(
            "/user-info",
            get(user_info).route_layer(middleware::from_fn_with_state(state, require_session)),
        )
}

/// Start OAuth flow - redirect to Google authorization.
///
/// A fresh anti-forgery state is stored in the session and must come back
/// unchanged on the callback.
async fn login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<(CookieJar, Redirect)> {
    let mut session = state.sessions.load(&jar)?;

    let oauth_state = state.sessions.generate_token()?;
    state.sessions.begin_login(&mut session, oauth_state.clone());
    state.sessions.save(&mut session)?;

    let auth_url = state.oauth.authorization_url(&oauth_state);

    tracing::info!(
        client_id = %state.config.client_id,
        "Starting OAuth flow, redirecting to Google"
    );

    let jar = jar.add(state.sessions.cookie(&session));
    Ok((jar, Redirect::temporary(&auth_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, fetch identity, bind it to the session.
async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            if let Some(error) = &params.error {
                tracing::warn!(error = %error, "OAuth error from provider");
            }
            AppError::BadRequest("Code not found in query".to_string())
        })?;

    let mut session = state.sessions.load(&jar)?;

    // The pending state is single-use: persist its removal before the
    // provider is contacted, so a failed exchange cannot be replayed.
    let expected = session.take_oauth_state();
    if !session.is_new() {
        state.sessions.save(&mut session)?;
    }
    if !state_matches(expected.as_deref(), params.state.as_deref()) {
        tracing::warn!("OAuth state missing or mismatched, rejecting callback");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    tracing::info!("Exchanging authorization code for tokens");
    let token = state.oauth.exchange_code(&code).await?;
    let identity = state.oauth.fetch_identity(&token).await?;

    // New identifier on privilege change.
    state.sessions.regenerate(&mut session)?;
    session.set_identity(identity);
    state.sessions.save(&mut session)?;

    tracing::info!(
        email = %session.identity().map(|i| i.email.as_str()).unwrap_or_default(),
        "OAuth successful, session established"
    );

    let jar = jar.add(state.sessions.cookie(&session));
    Ok((jar, Redirect::to(WELCOME_PAGE)))
}

fn state_matches(expected: Option<&str>, received: Option<&str>) -> bool {
    match (expected, received) {
        (Some(expected), Some(received)) => {
            bool::from(expected.as_bytes().ct_eq(received.as_bytes()))
        }
        _ => false,
    }
}

/// Identity bound to the current session.
async fn user_info(Extension(identity): Extension<UserIdentity>) -> Json<UserIdentity> {
    Json(identity)
}

/// Logout - drop the server-side session and clear the cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<(CookieJar, Redirect)> {
    let session = state.sessions.load(&jar)?;
    if !session.is_new() {
        state.sessions.destroy(&session)?;
        tracing::info!("Session destroyed on logout");
    }

    let jar = jar.add(state.sessions.removal_cookie());
    Ok((jar, Redirect::to("/")))
}
