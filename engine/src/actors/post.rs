// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Post actor
//!
//! Owns every post: creation, votes and the comment counter. It never calls the comment
//! actor; the comment actor calls it.
//!

use crate::{
    actors::{ContentEvent, UserSupervisor, users_path},
    cache::EntityStore,
    error::Error,
    model::{Post, PostId, SubredditId, Tally, UserId, VoteDirection},
    repos::Repositories,
    voting::cast_vote,
};

use actor::{Actor, ActorContext, ActorPath, ActorRef, Handler, Message, Response};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

pub struct PostActor {
    posts: EntityStore<Post>,
    users: Option<ActorRef<UserSupervisor>>,
}

impl PostActor {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            posts: EntityStore::new(repos.posts.clone()),
            users: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PostCommand {
    /// Membership of the author is checked by the caller.
    Create {
        subreddit: SubredditId,
        author: UserId,
        title: String,
        content: String,
    },
    Get(PostId),
    Vote {
        post: PostId,
        voter: UserId,
        direction: VoteDirection,
    },
    /// Posts of a subreddit, oldest first.
    ListBySubreddit(SubredditId),
    /// Adds `delta` to the comment count, never going below zero.
    AdjustComments {
        post: PostId,
        delta: i64,
    },
}

impl Message for PostCommand {}

#[derive(Debug, Clone)]
pub enum PostResponse {
    Post(Post),
    Posts(std::vec::IntoIter<Post>),
}

impl Response for PostResponse {}

#[async_trait]
impl Actor for PostActor {
    type Message = PostCommand;
    type Event = ContentEvent;
    type Response = PostResponse;
    type Error = Error;

    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        self.users = ctx.system().get_actor(&users_path()).await;
        if self.users.is_none() {
            warn!("Post actor started without a user supervisor.");
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<PostActor> for PostActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: PostCommand,
        ctx: &mut ActorContext<PostActor>,
    ) -> Result<PostResponse, Error> {
        match msg {
            PostCommand::Create {
                subreddit,
                author,
                title,
                content,
            } => {
                let title = title.trim().to_owned();
                if title.is_empty() {
                    return Err(Error::invalid_input("post title is empty"));
                }
                let post = self.posts.create(Post {
                    id: PostId::new(),
                    title,
                    content,
                    author,
                    subreddit,
                    created_at: Utc::now(),
                    tally: Tally::default(),
                    comment_count: 0,
                })?;
                debug!("Post {} created in {}.", post.id, subreddit);
                if let Err(e) = ctx.publish_event(ContentEvent::PostCreated {
                    post: post.id,
                    subreddit,
                }) {
                    warn!("Event not published: {}", e);
                }
                Ok(PostResponse::Post(post))
            }
            PostCommand::Get(id) => {
                Ok(PostResponse::Post(self.posts.get(&id.to_string())?))
            }
            PostCommand::Vote {
                post,
                voter,
                direction,
            } => {
                let post = cast_vote(
                    &mut self.posts,
                    self.users.as_ref(),
                    &post.to_string(),
                    voter,
                    direction,
                )
                .await?;
                if let Err(e) = ctx.publish_event(ContentEvent::PostVoted {
                    post: post.id,
                    karma: post.karma(),
                }) {
                    warn!("Event not published: {}", e);
                }
                Ok(PostResponse::Post(post))
            }
            PostCommand::ListBySubreddit(subreddit) => {
                let mut posts =
                    self.posts.list_by("subreddit", &subreddit.to_string())?;
                posts.sort_by_key(|post| post.created_at);
                Ok(PostResponse::Posts(posts.into_iter()))
            }
            PostCommand::AdjustComments { post, delta } => {
                let (post, ()) = self.posts.modify(&post.to_string(), |post| {
                    post.comment_count =
                        post.comment_count.saturating_add_signed(delta);
                    Ok(())
                })?;
                Ok(PostResponse::Post(post))
            }
        }
    }
}
