// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Repositories of every entity kind, opened on one backend.

use crate::{
    error::Error,
    model::{Comment, DirectMessage, Post, Subreddit, User},
};

use store::{
    Repository,
    database::{Collection, DbManager},
};
use tracing::info;

#[derive(Clone)]
pub struct Repositories {
    pub users: Repository<User>,
    pub subreddits: Repository<Subreddit>,
    pub posts: Repository<Post>,
    pub comments: Repository<Comment>,
    pub messages: Repository<DirectMessage>,
}

impl Repositories {
    pub fn open<C, M>(manager: &M) -> Result<Self, Error>
    where
        C: Collection + 'static,
        M: DbManager<C>,
    {
        info!("Opening engine repositories");
        Ok(Self {
            users: Repository::new(manager, "users")?,
            subreddits: Repository::new(manager, "subreddits")?,
            posts: Repository::new(manager, "posts")?,
            comments: Repository::new(manager, "comments")?,
            messages: Repository::new(manager, "messages")?,
        })
    }
}
