// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret authentication middleware for write routes.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the write secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Require `X-API-Key` to match the configured secret.
///
/// Missing header is 401; a present but wrong key is 403.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|h| h.as_bytes())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("API key required".to_string()))?;

    if !keys_match(provided, state.config.api_key.as_bytes()) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Blocked write request with invalid API key"
        );
        return Err(AppError::Forbidden("Invalid API key".to_string()));
    }

    Ok(next.run(request).await)
}

/// Constant-time comparison (length mismatch returns early).
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.ct_eq(expected).into()
}
