// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard routes: session-gated listing and API-key-gated writes.

use crate::error::{AppError, Result};
use crate::middleware::{require_api_key, require_session};
use crate::models::{EntryChanges, LeaderboardEntry, NewEntry, UserIdentity};
use crate::pagination::Pagination;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Leaderboard routes with their access gates attached.
///
/// Reads and writes are gated independently: a session does not allow
/// writes and an API key does not allow reads.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Gates wrap the method handlers only, so an unsupported method on a
    // known path is a plain 405 rather than a gate rejection.
    let session_gate = middleware::from_fn_with_state(state.clone(), require_session);
    let key_gate = middleware::from_fn_with_state(state, require_api_key);

    Router::new()
        .route(
            "/leaderboard",
            get(list_entries)
                .route_layer(session_gate)
                .merge(post(create_entry).route_layer(key_gate.clone())),
        )
        .route(
            "/leaderboard/{id}",
            put(update_entry)
                .delete(delete_entry)
                .route_layer(key_gate),
        )
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct PageQuery {
    page: Option<String>,
    limit: Option<String>,
}

/// Paginated listing envelope.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub data: Vec<LeaderboardEntry>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// List live entries, one page at a time.
async fn list_entries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserIdentity>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<LeaderboardPage>> {
    // A malformed query string falls back to the defaults, never a 400.
    let pagination = match query {
        Ok(Query(q)) => Pagination::from_raw(q.page.as_deref(), q.limit.as_deref()),
        Err(_) => Pagination::default(),
    };

    tracing::debug!(
        email = %user.email,
        page = pagination.page,
        limit = pagination.limit,
        "Fetching leaderboard"
    );

    let data = state
        .entries
        .list(pagination.offset(), pagination.limit)
        .await?;
    let total = state.entries.count().await?;

    Ok(Json(LeaderboardPage {
        data,
        page: pagination.page,
        limit: pagination.limit,
        total,
        total_pages: pagination.total_pages(total),
    }))
}

// ─── Writes ──────────────────────────────────────────────────

/// Response for entry deletion.
#[derive(Serialize)]
pub struct DeleteEntryResponse {
    pub message: String,
}

/// Create an entry.
async fn create_entry(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<NewEntry>, JsonRejection>,
) -> Result<Json<LeaderboardEntry>> {
    let Json(entry) = payload.map_err(parse_error)?;
    let created = state.entries.create(&entry).await?;

    tracing::info!(id = created.id, name = %created.name, score = created.score, "Entry created");
    Ok(Json(created))
}

/// Update an entry; fields absent from the body keep their stored value.
async fn update_entry(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<EntryChanges>, JsonRejection>,
) -> Result<Json<LeaderboardEntry>> {
    let id = entry_id(id)?;
    // Unknown IDs are reported before body errors.
    if state.entries.get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Entry {} not found", id)));
    }
    let Json(changes) = payload.map_err(parse_error)?;

    let updated = state.entries.update(id, &changes).await?;

    tracing::info!(id, score = updated.score, "Entry updated");
    Ok(Json(updated))
}

/// Soft-delete an entry.
async fn delete_entry(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteEntryResponse>> {
    let id = entry_id(id)?;
    state.entries.delete(id).await?;

    tracing::info!(id, "Entry deleted");
    Ok(Json(DeleteEntryResponse {
        message: "Entry deleted".to_string(),
    }))
}

/// A non-numeric ID cannot name a row.
fn entry_id(id: std::result::Result<Path<i64>, PathRejection>) -> Result<i64> {
    id.map(|Path(id)| id)
        .map_err(|_| AppError::NotFound("Entry not found".to_string()))
}

fn parse_error(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(format!("Cannot parse JSON: {}", rejection.body_text()))
}
