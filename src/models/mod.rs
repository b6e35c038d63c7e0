// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod entry;
pub mod identity;

pub use entry::{EntryChanges, LeaderboardEntry, NewEntry};
pub use identity::UserIdentity;
