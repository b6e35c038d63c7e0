// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite-backed leaderboard entry store.
//!
//! Every read and write is scoped to live rows (`deleted_at IS NULL`);
//! deletion only sets the marker.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use validator::Validate;

use crate::error::AppError;
use crate::models::{EntryChanges, LeaderboardEntry, NewEntry};

const ENTRY_COLUMNS: &str = "id, name, score, created_at, updated_at, deleted_at";

/// Leaderboard entry store.
#[derive(Clone)]
pub struct EntryStore {
    pool: Option<SqlitePool>,
}

impl EntryStore {
    /// Open the database and apply pending migrations.
    ///
    /// The database file is created if missing. In-memory URLs use a single
    /// long-lived connection, since each SQLite memory connection is its own
    /// database.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if is_in_memory(database_url) {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let store = Self { pool: Some(pool) };
        store.migrate().await?;

        tracing::info!(url = database_url, "Connected to SQLite");
        Ok(store)
    }

    /// Create an offline store for testing.
    ///
    /// All operations return a database error.
    pub fn new_offline() -> Self {
        Self { pool: None }
    }

    fn pool(&self) -> Result<&SqlitePool, AppError> {
        self.pool
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!()
            .run(self.pool()?)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Live entries ranked by score (highest first), ties broken by ID.
    pub async fn list(&self, offset: u64, limit: u32) -> Result<Vec<LeaderboardEntry>, AppError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM leaderboard_entries \
             WHERE deleted_at IS NULL \
             ORDER BY score DESC, id ASC \
             LIMIT ? OFFSET ?"
        );

        sqlx::query_as::<_, LeaderboardEntry>(&sql)
            .bind(i64::from(limit))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of live entries.
    pub async fn count(&self) -> Result<u64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leaderboard_entries WHERE deleted_at IS NULL")
                .fetch_one(self.pool()?)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Get a live entry by ID.
    pub async fn get(&self, id: i64) -> Result<Option<LeaderboardEntry>, AppError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM leaderboard_entries \
             WHERE id = ? AND deleted_at IS NULL"
        );

        sqlx::query_as::<_, LeaderboardEntry>(&sql)
            .bind(id)
            .fetch_optional(self.pool()?)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Validate and insert a new entry.
    pub async fn create(&self, entry: &NewEntry) -> Result<LeaderboardEntry, AppError> {
        entry.validate()?;

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO leaderboard_entries (name, score, created_at, updated_at) \
             VALUES (?, ?, ?, ?) \
             RETURNING {ENTRY_COLUMNS}"
        );

        let created = sqlx::query_as::<_, LeaderboardEntry>(&sql)
            .bind(&entry.name)
            .bind(entry.score)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool()?)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(id = created.id, score = created.score, "Entry created");
        Ok(created)
    }

    /// Merge `changes` over the live entry, validate, and replace it.
    ///
    /// Not atomic across the read and the write; concurrent updates to the
    /// same entry are last-writer-wins.
    pub async fn update(
        &self,
        id: i64,
        changes: &EntryChanges,
    ) -> Result<LeaderboardEntry, AppError> {
        let current = self.get(id).await?.ok_or_else(|| not_found(id))?;

        let replacement = changes.apply_to(&current);
        replacement.validate()?;

        let sql = format!(
            "UPDATE leaderboard_entries \
             SET name = ?, score = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL \
             RETURNING {ENTRY_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, LeaderboardEntry>(&sql)
            .bind(&replacement.name)
            .bind(replacement.score)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(self.pool()?)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            // Deleted between the read and the write.
            .ok_or_else(|| not_found(id))?;

        tracing::debug!(id, score = updated.score, "Entry updated");
        Ok(updated)
    }

    /// Soft-delete a live entry.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE leaderboard_entries \
             SET deleted_at = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool()?)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        tracing::debug!(id, "Entry deleted");
        Ok(())
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Entry {} not found", id))
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
