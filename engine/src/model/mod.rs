// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Domain model
//!
//! Entities persisted by the engine. Each one is a [`store::Record`]: users are unique by
//! email, subreddits by name, posts are listed by subreddit, comments by post and direct
//! messages by recipient.
//!

mod comment;
mod ids;
mod message;
mod post;
mod subreddit;
mod user;
mod vote;

pub use comment::Comment;
pub use ids::{CommentId, MessageId, PostId, SubredditId, UserId};
pub use message::DirectMessage;
pub use post::Post;
pub use subreddit::{Subreddit, name_key};
pub use user::{Session, User, UserProfile};
pub use vote::{Tally, VoteDirection};
