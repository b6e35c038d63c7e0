// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- OAuth (Google) ---
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect target registered with the provider
    pub redirect_url: String,

    // --- Write access ---
    /// Shared secret expected in the `X-API-Key` header
    pub api_key: String,

    // --- Server ---
    /// SQLite connection string
    pub database_url: String,
    /// Root directory for static assets
    pub static_dir: String,
    /// Server port
    pub port: u16,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
}

impl Config {
    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            client_secret: "test_client_secret".to_string(),
            redirect_url: "http://localhost:8080/callback".to_string(),
            api_key: "test_api_key".to_string(),
            database_url: "sqlite::memory:".to_string(),
            static_dir: "./static".to_string(),
            port: 8080,
            cookie_secure: false,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Fails if `API_KEY` is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_key = env::var("API_KEY")
            .map(|v| v.trim().to_string())
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("API_KEY"))?;

        Ok(Self {
            client_id: env::var("CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            redirect_url: env::var("REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:8080/callback".to_string()),
            api_key,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://leaderboard.db".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        })
    }

    /// Whether OAuth credentials were provided.
    pub fn has_oauth_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
