// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider-asserted user identity.

use serde::{Deserialize, Serialize};

/// Identity returned by the OAuth provider after a successful login.
///
/// Only ever held inside a session; never written to the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub email: String,
    pub name: String,
}
