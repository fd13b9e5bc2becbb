// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::model::{PostId, SubredditId, Tally, UserId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author: UserId,
    pub subreddit: SubredditId,
    pub created_at: DateTime<Utc>,
    pub tally: Tally,
    pub comment_count: u64,
}

impl Post {
    pub fn karma(&self) -> i64 {
        self.tally.karma
    }
}

impl Record for Post {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn relations(&self) -> Vec<(&'static str, String)> {
        vec![("subreddit", self.subreddit.to_string())]
    }
}
