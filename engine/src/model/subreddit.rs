// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::model::{SubredditId, UserId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::Record;

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subreddit {
    pub id: SubredditId,
    /// Unique, case-insensitively.
    pub name: String,
    pub description: String,
    pub creator: UserId,
    pub members: BTreeSet<UserId>,
    /// Always `members.len()`.
    pub member_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Subreddit {
    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// Adds `user`. False if already a member.
    pub fn add_member(&mut self, user: UserId) -> bool {
        let added = self.members.insert(user);
        self.member_count = self.members.len() as u64;
        added
    }

    /// Removes `user`. False if not a member.
    pub fn remove_member(&mut self, user: &UserId) -> bool {
        let removed = self.members.remove(user);
        self.member_count = self.members.len() as u64;
        removed
    }
}

/// Index value of a subreddit name.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Record for Subreddit {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", name_key(&self.name))]
    }
}
