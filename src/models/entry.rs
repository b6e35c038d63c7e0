// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard entry model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Minimum entry name length (characters).
pub const NAME_MIN_LEN: u64 = 3;
/// Maximum entry name length (characters).
pub const NAME_MAX_LEN: u64 = 100;
/// Lowest accepted score.
pub const SCORE_MIN: i64 = 0;
/// Highest accepted score.
pub const SCORE_MAX: i64 = 1000;

/// Leaderboard row stored in SQLite.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    /// Auto-assigned row ID
    pub id: i64,
    pub name: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; live rows have `None`
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Payload for creating an entry.
///
/// Missing fields default to empty/zero and are then rejected by validation
/// where that matters (an empty name is too short, zero is a valid score).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewEntry {
    #[serde(default)]
    #[validate(length(min = NAME_MIN_LEN, max = NAME_MAX_LEN))]
    pub name: String,
    #[serde(default)]
    #[validate(range(min = SCORE_MIN, max = SCORE_MAX))]
    pub score: i64,
}

impl NewEntry {
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Payload for updating an entry. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
}

impl EntryChanges {
    /// Overlay these changes on an existing entry, producing the full
    /// replacement values to validate and store.
    pub fn apply_to(&self, current: &LeaderboardEntry) -> NewEntry {
        NewEntry {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            score: self.score.unwrap_or(current.score),
        }
    }
}

impl From<NewEntry> for EntryChanges {
    fn from(entry: NewEntry) -> Self {
        Self {
            name: Some(entry.name),
            score: Some(entry.score),
        }
    }
}
