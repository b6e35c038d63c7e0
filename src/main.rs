// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard API Server
//!
//! Serves a paginated leaderboard: reads behind Google sign-in, writes
//! behind a shared API key.

use leaderboard_server::{
    config::Config,
    db::EntryStore,
    services::{GoogleOAuth, SessionStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment; refuses to start without API_KEY
    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    tracing::info!(port = config.port, "Starting Leaderboard API");

    if !config.has_oauth_credentials() {
        tracing::warn!("CLIENT_ID or CLIENT_SECRET not set; Google sign-in will fail");
    }

    // Open database and apply migrations
    let entries = EntryStore::connect(&config.database_url).await?;

    let sessions = SessionStore::in_memory(config.cookie_secure);
    let oauth = GoogleOAuth::new(&config)?;

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        entries,
        sessions,
        oauth,
    });

    // Build router
    let app = leaderboard_server::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, static_dir = %config.static_dir, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("leaderboard_server=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
