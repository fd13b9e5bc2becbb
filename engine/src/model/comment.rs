// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::model::{CommentId, PostId, SubredditId, Tally, UserId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::Record;

/// A node of a post's comment tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub author: UserId,
    pub post: PostId,
    /// Copied from the post at creation.
    pub subreddit: SubredditId,
    /// `None` for a top-level comment.
    pub parent: Option<CommentId>,
    /// Replies, in creation order.
    pub children: Vec<CommentId>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub tally: Tally,
}

impl Comment {
    pub fn karma(&self) -> i64 {
        self.tally.karma
    }
}

impl Record for Comment {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn relations(&self) -> Vec<(&'static str, String)> {
        vec![("post", self.post.to_string())]
    }
}
