// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Engine actors
//!
//! One actor per entity kind, plus the user supervisor and its per-user children:
//!
//! | Path | Actor |
//! |------|-------|
//! | `/user/users` | [`UserSupervisor`] |
//! | `/user/users/<id>` | [`UserActor`] |
//! | `/user/subreddits` | [`SubredditActor`] |
//! | `/user/posts` | [`PostActor`] |
//! | `/user/comments` | [`CommentActor`] |
//!
//! Calls only flow one way: comments ask posts, content actors tell the supervisor, the
//! supervisor asks user actors. Nothing asks back up that chain.
//!

mod comment;
mod post;
mod subreddit;
mod supervisor;
mod user;

pub use comment::{CommentActor, CommentCommand, CommentResponse};
pub use post::{PostActor, PostCommand, PostResponse};
pub use subreddit::{SubredditActor, SubredditCommand, SubredditResponse};
pub use supervisor::{SupervisorCommand, SupervisorResponse, UserSupervisor};
pub use user::{UserActor, UserCommand, UserResponse, UserState};

use crate::model::{CommentId, PostId, SubredditId};

use actor::{ActorPath, Event};
use serde::{Deserialize, Serialize};

pub const USERS: &str = "users";
pub const SUBREDDITS: &str = "subreddits";
pub const POSTS: &str = "posts";
pub const COMMENTS: &str = "comments";

pub fn users_path() -> ActorPath {
    ActorPath::from("/user") / USERS
}

/// Published by the content actors after each committed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentEvent {
    SubredditCreated {
        subreddit: SubredditId,
    },
    PostCreated {
        post: PostId,
        subreddit: SubredditId,
    },
    PostVoted {
        post: PostId,
        karma: i64,
    },
    CommentCreated {
        comment: CommentId,
        post: PostId,
    },
    CommentVoted {
        comment: CommentId,
        karma: i64,
    },
    CommentsDeleted {
        post: PostId,
        comments: Vec<CommentId>,
    },
}

impl Event for ContentEvent {}
