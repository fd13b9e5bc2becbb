// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Engine
//!
//! Entry point of the domain. The [`Engine`] owns references to the root actors and checks
//! the rules that need more than one of them before handing an operation to its owner:
//!
//! - creating a subreddit needs enough karma, and the creator becomes its first member;
//! - posting needs membership of the subreddit;
//! - joining and leaving touch the subreddit and the user one after the other, undoing the
//!   first step if the second fails.
//!
//! Everything else is forwarded as is. The engine is cheap to clone and holds no state of its
//! own.
//!

use crate::{
    actors::{
        COMMENTS, CommentActor, CommentCommand, CommentResponse, ContentEvent, POSTS, PostActor,
        PostCommand, PostResponse, SUBREDDITS, SubredditActor, SubredditCommand,
        SubredditResponse, SupervisorCommand, SupervisorResponse, USERS, UserSupervisor,
    },
    config::EngineConfig,
    error::{Error, ErrorKind},
    feed,
    model::{
        Comment, CommentId, DirectMessage, Post, PostId, Session, Subreddit, SubredditId,
        UserId, UserProfile, VoteDirection,
    },
    push::PushEvent,
    repos::Repositories,
    request::{Envelope, Reply, Request},
};

use actor::{ActorRef, ActorSystem, Sink, Subscriber, SystemRef, SystemRunner};
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use store::database::{Collection, DbManager};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use std::collections::BTreeSet;

#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    system: SystemRef,
    users: ActorRef<UserSupervisor>,
    subreddits: ActorRef<SubredditActor>,
    posts: ActorRef<PostActor>,
    comments: ActorRef<CommentActor>,
}

fn unexpected(actor: &str) -> Error {
    Error::new(
        ErrorKind::ActorTimeout,
        format!("unexpected response from the {} actor", actor),
    )
}

impl Engine {
    /// Opens the repositories on `manager` and spawns the actors. Cancelling `token` stops
    /// them; the returned runner resolves once they are all down.
    pub async fn start<C, M>(
        config: EngineConfig,
        manager: &M,
        token: CancellationToken,
    ) -> Result<(Self, SystemRunner), Error>
    where
        C: Collection + 'static,
        M: DbManager<C>,
    {
        let repos = Repositories::open(manager)?;
        let (system, runner) =
            ActorSystem::with_ask_timeout(token, config.ask_timeout());

        // The supervisor goes first: content actors look it up when they start.
        let users = system
            .create_root_actor(USERS, UserSupervisor::new(&repos, &config))
            .await?;
        let subreddits = system
            .create_root_actor(SUBREDDITS, SubredditActor::new(&repos))
            .await?;
        let posts = system
            .create_root_actor(POSTS, PostActor::new(&repos))
            .await?;
        let comments = system
            .create_root_actor(COMMENTS, CommentActor::new(&repos, posts.clone()))
            .await?;
        info!("Engine started.");

        Ok((
            Self {
                config,
                system,
                users,
                subreddits,
                posts,
                comments,
            },
            runner,
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stops every actor.
    pub fn stop(&self) {
        info!("Stopping engine.");
        self.system.stop_system();
    }

    /// Registers a subscriber for push events. It runs in its own task until the engine stops.
    pub async fn on_push<S>(&self, subscriber: S)
    where
        S: Subscriber<PushEvent>,
    {
        self.system
            .run_sink(Sink::new(self.users.subscribe(), subscriber))
            .await;
    }

    /// Registers a subscriber for content events of subreddits, posts and comments. Each
    /// source gets its own sink.
    pub async fn on_content<S>(&self, subscriber: S)
    where
        S: Subscriber<ContentEvent> + Clone,
    {
        self.system
            .run_sink(Sink::new(self.subreddits.subscribe(), subscriber.clone()))
            .await;
        self.system
            .run_sink(Sink::new(self.posts.subscribe(), subscriber.clone()))
            .await;
        self.system
            .run_sink(Sink::new(self.comments.subscribe(), subscriber))
            .await;
    }

    async fn ask_users(
        &self,
        command: SupervisorCommand,
    ) -> Result<SupervisorResponse, Error> {
        self.users.ask(command).await
    }

    async fn user_profile(
        &self,
        command: SupervisorCommand,
    ) -> Result<UserProfile, Error> {
        match self.ask_users(command).await? {
            SupervisorResponse::Profile(profile) => Ok(profile),
            _ => Err(unexpected(USERS)),
        }
    }

    async fn ask_subreddit(
        &self,
        command: SubredditCommand,
    ) -> Result<Subreddit, Error> {
        match self.subreddits.ask(command).await? {
            SubredditResponse::Subreddit(subreddit) => Ok(subreddit),
            _ => Err(unexpected(SUBREDDITS)),
        }
    }

    async fn ask_post(&self, command: PostCommand) -> Result<Post, Error> {
        match self.posts.ask(command).await? {
            PostResponse::Post(post) => Ok(post),
            _ => Err(unexpected(POSTS)),
        }
    }

    async fn ask_comment(&self, command: CommentCommand) -> Result<Comment, Error> {
        match self.comments.ask(command).await? {
            CommentResponse::Comment(comment) => Ok(comment),
            _ => Err(unexpected(COMMENTS)),
        }
    }

    async fn ask_comments(
        &self,
        command: CommentCommand,
    ) -> Result<std::vec::IntoIter<Comment>, Error> {
        match self.comments.ask(command).await? {
            CommentResponse::Comments(comments) => Ok(comments),
            _ => Err(unexpected(COMMENTS)),
        }
    }

    // Users.

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, Error> {
        self.user_profile(SupervisorCommand::Register {
            username: username.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
        })
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, Error> {
        match self
            .ask_users(SupervisorCommand::Login {
                email: email.to_owned(),
                password: password.to_owned(),
            })
            .await?
        {
            SupervisorResponse::Session(session) => Ok(session),
            _ => Err(unexpected(USERS)),
        }
    }

    pub async fn logout(&self, user: UserId, token: &str) -> Result<(), Error> {
        self.ask_users(SupervisorCommand::Logout {
            user,
            token: token.to_owned(),
        })
        .await
        .map(|_| ())
    }

    pub async fn authenticate(
        &self,
        user: UserId,
        token: &str,
    ) -> Result<UserProfile, Error> {
        self.user_profile(SupervisorCommand::Authenticate {
            user,
            token: token.to_owned(),
        })
        .await
    }

    pub async fn profile(&self, user: UserId) -> Result<UserProfile, Error> {
        self.user_profile(SupervisorCommand::GetProfile(user)).await
    }

    pub async fn set_connected(
        &self,
        user: UserId,
        connected: bool,
    ) -> Result<UserProfile, Error> {
        self.user_profile(SupervisorCommand::SetConnected { user, connected })
            .await
    }

    // Subreddits.

    pub async fn create_subreddit(
        &self,
        creator: UserId,
        name: &str,
        description: &str,
    ) -> Result<Subreddit, Error> {
        let profile = self.profile(creator).await?;
        let threshold = self.config.subreddit_karma_threshold;
        if profile.karma < threshold {
            return Err(Error::insufficient_karma(format!(
                "karma {} of user {} is below {}",
                profile.karma, creator, threshold
            )));
        }

        let subreddit = self
            .ask_subreddit(SubredditCommand::Create {
                name: name.to_owned(),
                description: description.to_owned(),
                creator,
            })
            .await?;
        if let Err(e) = self
            .ask_users(SupervisorCommand::AddMembership {
                user: creator,
                subreddit: subreddit.id,
            })
            .await
        {
            warn!(
                "Creator {} is a member of {} but the user record was not updated: {}",
                creator, subreddit.id, e
            );
        }
        Ok(subreddit)
    }

    pub async fn subreddit(&self, id: SubredditId) -> Result<Subreddit, Error> {
        self.ask_subreddit(SubredditCommand::Get(id)).await
    }

    pub async fn subreddit_by_name(&self, name: &str) -> Result<Subreddit, Error> {
        self.ask_subreddit(SubredditCommand::GetByName(name.to_owned()))
            .await
    }

    pub async fn list_subreddits(
        &self,
    ) -> Result<std::vec::IntoIter<Subreddit>, Error> {
        match self.subreddits.ask(SubredditCommand::List).await? {
            SubredditResponse::Subreddits(subreddits) => Ok(subreddits),
            _ => Err(unexpected(SUBREDDITS)),
        }
    }

    /// Adds `user` to the member set, then the subreddit to the user. If the second step
    /// fails the first one is undone, once.
    pub async fn join_subreddit(
        &self,
        user: UserId,
        subreddit: SubredditId,
    ) -> Result<Subreddit, Error> {
        let joined = self
            .ask_subreddit(SubredditCommand::Join { subreddit, user })
            .await?;
        if let Err(e) = self
            .ask_users(SupervisorCommand::AddMembership { user, subreddit })
            .await
        {
            warn!(
                "Membership of {} in {} not recorded on the user, undoing join: {}",
                user, subreddit, e
            );
            if let Err(undo) = self
                .ask_subreddit(SubredditCommand::Leave { subreddit, user })
                .await
            {
                warn!(
                    "Undoing join failed, {} stays in the members of {}: {}",
                    user, subreddit, undo
                );
            }
            return Err(e);
        }
        Ok(joined)
    }

    /// Inverse of [`Engine::join_subreddit`], with the same compensation.
    pub async fn leave_subreddit(
        &self,
        user: UserId,
        subreddit: SubredditId,
    ) -> Result<Subreddit, Error> {
        let left = self
            .ask_subreddit(SubredditCommand::Leave { subreddit, user })
            .await?;
        if let Err(e) = self
            .ask_users(SupervisorCommand::RemoveMembership { user, subreddit })
            .await
        {
            warn!(
                "Membership of {} in {} not removed from the user, undoing leave: {}",
                user, subreddit, e
            );
            if let Err(undo) = self
                .ask_subreddit(SubredditCommand::Join { subreddit, user })
                .await
            {
                warn!(
                    "Undoing leave failed, {} is missing from the members of {}: {}",
                    user, subreddit, undo
                );
            }
            return Err(e);
        }
        Ok(left)
    }

    // Posts.

    pub async fn create_post(
        &self,
        author: UserId,
        subreddit: SubredditId,
        title: &str,
        content: &str,
    ) -> Result<Post, Error> {
        let members: BTreeSet<UserId> =
            match self.subreddits.ask(SubredditCommand::Members(subreddit)).await? {
                SubredditResponse::Members(members) => members,
                _ => return Err(unexpected(SUBREDDITS)),
            };
        if !members.contains(&author) {
            return Err(Error::unauthorized(format!(
                "user {} is not a member of {}",
                author, subreddit
            )));
        }
        self.ask_post(PostCommand::Create {
            subreddit,
            author,
            title: title.to_owned(),
            content: content.to_owned(),
        })
        .await
    }

    pub async fn post(&self, id: PostId) -> Result<Post, Error> {
        self.ask_post(PostCommand::Get(id)).await
    }

    pub async fn list_posts(
        &self,
        subreddit: SubredditId,
    ) -> Result<std::vec::IntoIter<Post>, Error> {
        match self
            .posts
            .ask(PostCommand::ListBySubreddit(subreddit))
            .await?
        {
            PostResponse::Posts(posts) => Ok(posts),
            _ => Err(unexpected(POSTS)),
        }
    }

    pub async fn vote_post(
        &self,
        voter: UserId,
        post: PostId,
        direction: VoteDirection,
    ) -> Result<Post, Error> {
        self.profile(voter).await?;
        self.ask_post(PostCommand::Vote {
            post,
            voter,
            direction,
        })
        .await
    }

    // Comments.

    pub async fn create_comment(
        &self,
        author: UserId,
        post: PostId,
        parent: Option<CommentId>,
        content: &str,
    ) -> Result<Comment, Error> {
        self.profile(author).await?;
        self.ask_comment(CommentCommand::Create {
            post,
            author,
            parent,
            content: content.to_owned(),
        })
        .await
    }

    pub async fn comment(&self, id: CommentId) -> Result<Comment, Error> {
        self.ask_comment(CommentCommand::Get(id)).await
    }

    pub async fn list_comments(
        &self,
        post: PostId,
    ) -> Result<std::vec::IntoIter<Comment>, Error> {
        self.ask_comments(CommentCommand::ListByPost(post)).await
    }

    pub async fn list_replies(
        &self,
        comment: CommentId,
    ) -> Result<std::vec::IntoIter<Comment>, Error> {
        self.ask_comments(CommentCommand::ListReplies(comment)).await
    }

    pub async fn vote_comment(
        &self,
        voter: UserId,
        comment: CommentId,
        direction: VoteDirection,
    ) -> Result<Comment, Error> {
        self.profile(voter).await?;
        self.ask_comment(CommentCommand::Vote {
            comment,
            voter,
            direction,
        })
        .await
    }

    /// Soft-deletes a comment and its replies. Returns how many comments were marked.
    pub async fn delete_comment(
        &self,
        requestor: UserId,
        comment: CommentId,
    ) -> Result<u64, Error> {
        match self
            .comments
            .ask(CommentCommand::Delete { comment, requestor })
            .await?
        {
            CommentResponse::Deleted(count) => Ok(count),
            _ => Err(unexpected(COMMENTS)),
        }
    }

    // Feed.

    /// Posts of every subreddit `user` belongs to, best first.
    pub async fn feed(
        &self,
        user: UserId,
        limit: Option<usize>,
    ) -> Result<std::vec::IntoIter<Post>, Error> {
        let profile = self.profile(user).await?;
        let listings = join_all(
            profile
                .subreddits
                .iter()
                .map(|subreddit| self.list_posts(*subreddit)),
        )
        .await;

        let mut posts = Vec::new();
        for listing in listings {
            match listing {
                Ok(listing) => posts.extend(listing),
                // A subreddit may be gone while the user record still lists it.
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("Skipping subreddit in feed of {}: {}", user, e);
                }
                Err(e) => return Err(e),
            }
        }
        let limit = limit.unwrap_or(self.config.feed_limit);
        Ok(feed::rank(posts, Utc::now(), limit))
    }

    // Direct messages.

    pub async fn send_message(
        &self,
        from: UserId,
        to: UserId,
        body: &str,
    ) -> Result<DirectMessage, Error> {
        match self
            .ask_users(SupervisorCommand::SendMessage {
                from,
                to,
                body: body.to_owned(),
            })
            .await?
        {
            SupervisorResponse::Message(message) => Ok(message),
            _ => Err(unexpected(USERS)),
        }
    }

    pub async fn inbox(&self, user: UserId) -> Result<Vec<DirectMessage>, Error> {
        match self.ask_users(SupervisorCommand::Inbox(user)).await? {
            SupervisorResponse::Messages(messages) => Ok(messages),
            _ => Err(unexpected(USERS)),
        }
    }

    // Routing.

    /// Runs one typed request.
    pub async fn dispatch(&self, request: Request) -> Result<Reply, Error> {
        debug!("Dispatching {:?}", request);
        let reply = match request {
            Request::Register {
                username,
                email,
                password,
            } => Reply::Profile(self.register(&username, &email, &password).await?),
            Request::Login { email, password } => {
                Reply::Session(self.login(&email, &password).await?)
            }
            Request::Logout { user, token } => {
                self.logout(user, &token).await?;
                Reply::Done
            }
            Request::Authenticate { user, token } => {
                Reply::Profile(self.authenticate(user, &token).await?)
            }
            Request::GetProfile { user } => Reply::Profile(self.profile(user).await?),
            Request::SetConnected { user, connected } => {
                Reply::Profile(self.set_connected(user, connected).await?)
            }
            Request::CreateSubreddit {
                creator,
                name,
                description,
            } => Reply::Subreddit(
                self.create_subreddit(creator, &name, &description).await?,
            ),
            Request::GetSubreddit { subreddit } => {
                Reply::Subreddit(self.subreddit(subreddit).await?)
            }
            Request::GetSubredditByName { name } => {
                Reply::Subreddit(self.subreddit_by_name(&name).await?)
            }
            Request::ListSubreddits {} => {
                Reply::Subreddits(self.list_subreddits().await?.collect())
            }
            Request::JoinSubreddit { user, subreddit } => {
                Reply::Subreddit(self.join_subreddit(user, subreddit).await?)
            }
            Request::LeaveSubreddit { user, subreddit } => {
                Reply::Subreddit(self.leave_subreddit(user, subreddit).await?)
            }
            Request::CreatePost {
                author,
                subreddit,
                title,
                content,
            } => Reply::Post(
                self.create_post(author, subreddit, &title, &content).await?,
            ),
            Request::GetPost { post } => Reply::Post(self.post(post).await?),
            Request::ListPosts { subreddit } => {
                Reply::Posts(self.list_posts(subreddit).await?.collect())
            }
            Request::VotePost {
                voter,
                post,
                direction,
            } => Reply::Post(self.vote_post(voter, post, direction).await?),
            Request::CreateComment {
                author,
                post,
                parent,
                content,
            } => Reply::Comment(
                self.create_comment(author, post, parent, &content).await?,
            ),
            Request::GetComment { comment } => {
                Reply::Comment(self.comment(comment).await?)
            }
            Request::ListComments { post } => {
                Reply::Comments(self.list_comments(post).await?.collect())
            }
            Request::ListReplies { comment } => {
                Reply::Comments(self.list_replies(comment).await?.collect())
            }
            Request::VoteComment {
                voter,
                comment,
                direction,
            } => Reply::Comment(self.vote_comment(voter, comment, direction).await?),
            Request::DeleteComment { requestor, comment } => Reply::Deleted {
                count: self.delete_comment(requestor, comment).await?,
            },
            Request::GetFeed { user, limit } => {
                Reply::Posts(self.feed(user, limit).await?.collect())
            }
            Request::SendMessage { from, to, body } => {
                Reply::Message(self.send_message(from, to, &body).await?)
            }
            Request::Inbox { user } => Reply::Messages(self.inbox(user).await?),
        };
        Ok(reply)
    }

    /// Decodes an envelope by its declared kind and runs it.
    ///
    /// Unknown kinds are dropped with a warning and yield `None`. A payload that does not fit
    /// its kind is `InvalidInput`.
    pub async fn dispatch_envelope(
        &self,
        envelope: Envelope,
    ) -> Option<Result<Reply, Error>> {
        let Envelope { kind, payload } = envelope;
        if !Request::is_known_kind(&kind) {
            warn!("Dropping message of unknown kind '{}'.", kind);
            return None;
        }
        let payload = if payload.is_null() { json!({}) } else { payload };
        let request = match serde_json::from_value::<Request>(
            json!({ "kind": kind, "payload": payload }),
        ) {
            Ok(request) => request,
            Err(e) => {
                return Some(Err(Error::invalid_input(format!(
                    "malformed {} payload: {}",
                    kind, e
                ))
                .with_cause(e)));
            }
        };
        Some(self.dispatch(request).await)
    }
}
