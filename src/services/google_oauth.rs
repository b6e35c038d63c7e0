// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth2 authorization-code client.
//!
//! Handles:
//! - Building the authorization redirect URL
//! - Exchanging an authorization code for an access token
//! - Fetching the signed-in user's email and name
//!
//! Failures are reported immediately; nothing here retries.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::config::Config;
use crate::models::UserIdentity;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Scopes requested at login (email + profile read).
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// OAuth failure categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OAuthError {
    /// The code was empty or the provider rejected the exchange.
    #[error("Failed to exchange token: {0}")]
    Exchange(String),

    /// The userinfo request failed or returned an unusable body.
    #[error("Failed to get user info: {0}")]
    IdentityFetch(String),
}

/// Provider endpoints.
#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

/// Token response from the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Present because offline access is requested; only logged.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Userinfo payload; only the fields we keep.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    email: String,
    #[serde(default)]
    name: String,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    endpoints: OAuthEndpoints,
}

impl GoogleOAuth {
    /// Client talking to Google's production endpoints.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_endpoints(config, OAuthEndpoints::default())
    }

    /// Client talking to the given endpoints.
    pub fn with_endpoints(config: &Config, endpoints: OAuthEndpoints) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building OAuth HTTP client")?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
            endpoints,
        })
    }

    /// Authorization URL for the given anti-forgery state.
    ///
    /// Requests a `code` response and offline access. Pure function of the
    /// configuration and `state`.
    pub fn authorization_url(&self, state: &str) -> String {
        let scope = SCOPES.join(" ");
        format!(
            "{}?access_type=offline&\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             state={}",
            self.endpoints.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&scope),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a token.
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthToken, OAuthError> {
        if code.trim().is_empty() {
            return Err(OAuthError::Exchange(
                "authorization code is empty".to_string(),
            ));
        }

        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Token exchange rejected");
            return Err(OAuthError::Exchange(format!("HTTP {}: {}", status, body)));
        }

        let token: OAuthToken = response
            .json()
            .await
            .map_err(|e| OAuthError::Exchange(format!("invalid token response: {}", e)))?;

        tracing::debug!(
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            expires_in = ?token.expires_in,
            has_refresh_token = token.refresh_token.is_some(),
            "Authorization code exchanged"
        );
        Ok(token)
    }

    /// Fetch the signed-in user's identity.
    pub async fn fetch_identity(&self, token: &OAuthToken) -> Result<UserIdentity, OAuthError> {
        let response = self
            .http
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::IdentityFetch(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::IdentityFetch(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::IdentityFetch(format!("failed to decode user info: {}", e)))?;

        Ok(UserIdentity {
            email: info.email,
            name: info.name,
        })
    }
}
