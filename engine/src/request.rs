// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Requests
//!
//! One [`Request`] per public operation, each answered by a [`Reply`]. Transports that only
//! have a kind string and a JSON payload wrap them in an [`Envelope`].
//!

use crate::model::{
    Comment, CommentId, DirectMessage, Post, PostId, Session, Subreddit, SubredditId, UserId,
    UserProfile, VoteDirection,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Request {
    Register {
        username: String,
        email: String,
        password: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout {
        user: UserId,
        token: String,
    },
    Authenticate {
        user: UserId,
        token: String,
    },
    GetProfile {
        user: UserId,
    },
    SetConnected {
        user: UserId,
        connected: bool,
    },
    CreateSubreddit {
        creator: UserId,
        name: String,
        #[serde(default)]
        description: String,
    },
    GetSubreddit {
        subreddit: SubredditId,
    },
    GetSubredditByName {
        name: String,
    },
    ListSubreddits {},
    JoinSubreddit {
        user: UserId,
        subreddit: SubredditId,
    },
    LeaveSubreddit {
        user: UserId,
        subreddit: SubredditId,
    },
    CreatePost {
        author: UserId,
        subreddit: SubredditId,
        title: String,
        #[serde(default)]
        content: String,
    },
    GetPost {
        post: PostId,
    },
    ListPosts {
        subreddit: SubredditId,
    },
    VotePost {
        voter: UserId,
        post: PostId,
        direction: VoteDirection,
    },
    CreateComment {
        author: UserId,
        post: PostId,
        #[serde(default)]
        parent: Option<CommentId>,
        content: String,
    },
    GetComment {
        comment: CommentId,
    },
    ListComments {
        post: PostId,
    },
    ListReplies {
        comment: CommentId,
    },
    VoteComment {
        voter: UserId,
        comment: CommentId,
        direction: VoteDirection,
    },
    DeleteComment {
        requestor: UserId,
        comment: CommentId,
    },
    GetFeed {
        user: UserId,
        #[serde(default)]
        limit: Option<usize>,
    },
    SendMessage {
        from: UserId,
        to: UserId,
        body: String,
    },
    Inbox {
        user: UserId,
    },
}

impl Request {
    /// Every kind a [`Request`] can be decoded from.
    pub const KINDS: &'static [&'static str] = &[
        "Register",
        "Login",
        "Logout",
        "Authenticate",
        "GetProfile",
        "SetConnected",
        "CreateSubreddit",
        "GetSubreddit",
        "GetSubredditByName",
        "ListSubreddits",
        "JoinSubreddit",
        "LeaveSubreddit",
        "CreatePost",
        "GetPost",
        "ListPosts",
        "VotePost",
        "CreateComment",
        "GetComment",
        "ListComments",
        "ListReplies",
        "VoteComment",
        "DeleteComment",
        "GetFeed",
        "SendMessage",
        "Inbox",
    ];

    pub fn is_known_kind(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Reply {
    Profile(UserProfile),
    Session(Session),
    Subreddit(Subreddit),
    Subreddits(Vec<Subreddit>),
    Post(Post),
    Posts(Vec<Post>),
    Comment(Comment),
    Comments(Vec<Comment>),
    Deleted { count: u64 },
    Message(DirectMessage),
    Messages(Vec<DirectMessage>),
    Done,
}

/// A request as a transport sees it: a declared kind and an untyped payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_kinds_match_variants() {
        let user = UserId::new();
        let samples = vec![
            Request::GetProfile { user },
            Request::ListSubreddits {},
            Request::Inbox { user },
            Request::GetFeed { user, limit: Some(3) },
        ];
        for request in samples {
            let value = serde_json::to_value(&request).unwrap();
            let kind = value["kind"].as_str().unwrap().to_owned();
            assert!(Request::is_known_kind(&kind), "{} is not listed", kind);
        }
        assert!(!Request::is_known_kind("Teleport"));
    }

    #[test]
    fn test_decode_from_kind_and_payload() {
        let user = UserId::new();
        let value = json!({
            "kind": "GetFeed",
            "payload": { "user": user.to_string() }
        });
        let request: Request = serde_json::from_value(value).unwrap();
        assert_eq!(request, Request::GetFeed { user, limit: None });
    }
}
