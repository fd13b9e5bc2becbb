// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Comment actor
//!
//! Owns every comment tree. Creation and deletion keep the owning post's comment count in line
//! by asking the post actor, which never calls back here.
//!

use crate::{
    actors::{ContentEvent, PostActor, PostCommand, PostResponse, UserSupervisor, users_path},
    cache::EntityStore,
    error::{Error, ErrorKind},
    model::{Comment, CommentId, Post, PostId, Tally, UserId, VoteDirection},
    repos::Repositories,
    voting::cast_vote,
};

use actor::{Actor, ActorContext, ActorPath, ActorRef, Handler, Message, Response};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, warn};

use std::collections::{HashSet, VecDeque};

pub struct CommentActor {
    comments: EntityStore<Comment>,
    posts: ActorRef<PostActor>,
    users: Option<ActorRef<UserSupervisor>>,
}

impl CommentActor {
    pub fn new(repos: &Repositories, posts: ActorRef<PostActor>) -> Self {
        Self {
            comments: EntityStore::new(repos.comments.clone()),
            posts,
            users: None,
        }
    }

    async fn post(&self, id: PostId) -> Result<Post, Error> {
        match self.posts.ask(PostCommand::Get(id)).await? {
            PostResponse::Post(post) => Ok(post),
            PostResponse::Posts(_) => {
                Err(Error::new(ErrorKind::ActorTimeout, "unexpected post response"))
            }
        }
    }

    async fn adjust_comments(&self, post: PostId, delta: i64) -> Result<(), Error> {
        self.posts
            .ask(PostCommand::AdjustComments { post, delta })
            .await
            .map(|_| ())
    }

    async fn create(
        &mut self,
        post: PostId,
        author: UserId,
        parent: Option<CommentId>,
        content: String,
    ) -> Result<Comment, Error> {
        if content.trim().is_empty() {
            return Err(Error::invalid_input("comment is empty"));
        }
        let owner = self.post(post).await?;
        if let Some(parent) = parent {
            let parent = self.comments.get(&parent.to_string())?;
            if parent.post != post {
                return Err(Error::invalid_input(format!(
                    "comment {} does not belong to post {}",
                    parent.id, post
                )));
            }
            if parent.deleted {
                return Err(Error::not_found(format!(
                    "comment {} is deleted",
                    parent.id
                )));
            }
        }

        // Count first; undone if the comment is not stored.
        self.adjust_comments(post, 1).await?;
        let comment = Comment {
            id: CommentId::new(),
            content,
            author,
            post,
            subreddit: owner.subreddit,
            parent,
            children: Vec::new(),
            deleted: false,
            created_at: Utc::now(),
            tally: Tally::default(),
        };
        let stored = match self.store_comment(comment) {
            Ok(stored) => stored,
            Err(e) => {
                if let Err(undo) = self.adjust_comments(post, -1).await {
                    warn!(
                        "Comment count of {} is off by one: {}",
                        post, undo
                    );
                }
                return Err(e);
            }
        };
        Ok(stored)
    }

    /// Persists `comment` and links it under its parent. A reply that can not be linked is
    /// removed again.
    fn store_comment(&mut self, comment: Comment) -> Result<Comment, Error> {
        let comment = self.comments.create(comment)?;
        let Some(parent) = comment.parent else {
            return Ok(comment);
        };
        let id = comment.id;
        let linked = self.comments.modify(&parent.to_string(), |parent| {
            parent.children.push(id);
            Ok(())
        });
        if let Err(e) = linked {
            if let Err(undo) = self.comments.remove(&id.to_string()) {
                error!(
                    "Reply {} is stored but not linked under {}: {}",
                    id, parent, undo
                );
            }
            return Err(e);
        }
        Ok(comment)
    }

    /// Live comments of the subtree rooted at `id`, breadth first.
    fn live_subtree(&mut self, id: CommentId) -> Result<Vec<CommentId>, Error> {
        let mut live = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = VecDeque::from([id]);
        while let Some(next) = pending.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            let node = self.comments.get(&next.to_string())?;
            pending.extend(node.children.iter().copied());
            if !node.deleted {
                live.push(next);
            }
        }
        Ok(live)
    }

    /// Soft-deletes `id` and its whole subtree. Returns the newly deleted ids, root first.
    ///
    /// The post count is lowered first and restored for whatever is left standing if a
    /// write fails. Replies are marked before their parents, so an interrupted delete leaves
    /// the root live and can be run again.
    async fn delete(
        &mut self,
        id: CommentId,
        requestor: UserId,
    ) -> Result<(PostId, Vec<CommentId>), Error> {
        let root = self.comments.get(&id.to_string())?;
        if root.deleted {
            return Err(Error::not_found(format!("comment {} is deleted", id)));
        }
        if root.author != requestor {
            return Err(Error::unauthorized(format!(
                "user {} is not the author of comment {}",
                requestor, id
            )));
        }

        let subtree = self.live_subtree(id)?;
        let count = subtree.len() as i64;
        self.adjust_comments(root.post, -count).await?;

        let mut deleted = Vec::with_capacity(subtree.len());
        for next in subtree.iter().rev() {
            let marked = self.comments.modify(&next.to_string(), |node| {
                node.deleted = true;
                Ok(())
            });
            if let Err(e) = marked {
                let standing = count - deleted.len() as i64;
                warn!(
                    "Deleted {} of {} comments under {}: {}",
                    deleted.len(),
                    count,
                    id,
                    e
                );
                if let Err(undo) = self.adjust_comments(root.post, standing).await {
                    error!(
                        "Comment count of post {} is short by {}: {}",
                        root.post, standing, undo
                    );
                }
                return Err(e);
            }
            deleted.push(*next);
        }
        deleted.reverse();
        Ok((root.post, deleted))
    }

    fn list_replies(&mut self, id: CommentId) -> Result<Vec<Comment>, Error> {
        let parent = self.comments.get(&id.to_string())?;
        parent
            .children
            .iter()
            .map(|child| self.comments.get(&child.to_string()))
            .collect()
    }

    fn publish(&self, ctx: &ActorContext<CommentActor>, event: ContentEvent) {
        if let Err(e) = ctx.publish_event(event) {
            warn!("Event not published: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
pub enum CommentCommand {
    Create {
        post: PostId,
        author: UserId,
        parent: Option<CommentId>,
        content: String,
    },
    Get(CommentId),
    Vote {
        comment: CommentId,
        voter: UserId,
        direction: VoteDirection,
    },
    /// Only the author may delete. Replies go with the comment.
    Delete {
        comment: CommentId,
        requestor: UserId,
    },
    /// The whole tree of a post, in creation order.
    ListByPost(PostId),
    /// Direct replies, in reply order.
    ListReplies(CommentId),
}

impl Message for CommentCommand {}

#[derive(Debug, Clone)]
pub enum CommentResponse {
    Comment(Comment),
    Comments(std::vec::IntoIter<Comment>),
    /// Number of comments marked deleted.
    Deleted(u64),
}

impl Response for CommentResponse {}

#[async_trait]
impl Actor for CommentActor {
    type Message = CommentCommand;
    type Event = ContentEvent;
    type Response = CommentResponse;
    type Error = Error;

    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        self.users = ctx.system().get_actor(&users_path()).await;
        if self.users.is_none() {
            warn!("Comment actor started without a user supervisor.");
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<CommentActor> for CommentActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: CommentCommand,
        ctx: &mut ActorContext<CommentActor>,
    ) -> Result<CommentResponse, Error> {
        match msg {
            CommentCommand::Create {
                post,
                author,
                parent,
                content,
            } => {
                let comment = self.create(post, author, parent, content).await?;
                debug!("Comment {} created on {}.", comment.id, post);
                self.publish(
                    ctx,
                    ContentEvent::CommentCreated {
                        comment: comment.id,
                        post,
                    },
                );
                Ok(CommentResponse::Comment(comment))
            }
            CommentCommand::Get(id) => Ok(CommentResponse::Comment(
                self.comments.get(&id.to_string())?,
            )),
            CommentCommand::Vote {
                comment,
                voter,
                direction,
            } => {
                let comment = cast_vote(
                    &mut self.comments,
                    self.users.as_ref(),
                    &comment.to_string(),
                    voter,
                    direction,
                )
                .await?;
                self.publish(
                    ctx,
                    ContentEvent::CommentVoted {
                        comment: comment.id,
                        karma: comment.karma(),
                    },
                );
                Ok(CommentResponse::Comment(comment))
            }
            CommentCommand::Delete { comment, requestor } => {
                let (post, deleted) = self.delete(comment, requestor).await?;
                debug!("{} comments deleted under {}.", deleted.len(), comment);
                let count = deleted.len() as u64;
                self.publish(
                    ctx,
                    ContentEvent::CommentsDeleted {
                        post,
                        comments: deleted,
                    },
                );
                Ok(CommentResponse::Deleted(count))
            }
            CommentCommand::ListByPost(post) => {
                let mut comments =
                    self.comments.list_by("post", &post.to_string())?;
                comments.sort_by_key(|comment| comment.created_at);
                Ok(CommentResponse::Comments(comments.into_iter()))
            }
            CommentCommand::ListReplies(id) => Ok(CommentResponse::Comments(
                self.list_replies(id)?.into_iter(),
            )),
        }
    }
}
