// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::model::{SubredditId, UserId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::Record;

use std::collections::BTreeSet;

/// Persistent user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Lowercase, unique.
    pub email: String,
    /// `salt$hex(sha256(salt || password))`.
    pub password_hash: String,
    pub karma: i64,
    pub connected: bool,
    pub last_active: DateTime<Utc>,
    pub subreddits: BTreeSet<SubredditId>,
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("email", self.email.clone())]
    }
}

/// What the engine hands out about a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub karma: i64,
    pub connected: bool,
    pub last_active: DateTime<Utc>,
    pub subreddits: BTreeSet<SubredditId>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            karma: user.karma,
            connected: user.connected,
            last_active: user.last_active,
            subreddits: user.subreddits.clone(),
        }
    }
}

/// Token issued on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
