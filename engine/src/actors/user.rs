// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # User actor
//!
//! One actor per resident user, child of the [`UserSupervisor`](super::UserSupervisor). It owns
//! the persisted user record (through a one-entry cache) and the volatile state: the current
//! session and the connection flag.
//!
//! An actor spawned for an id with no record starts `Uninitialized` and only accepts
//! `Register`. Once registered it moves between `Registered` and `LoggedIn` as sessions are
//! issued and dropped; both states accept karma deltas and profile reads.
//!

use crate::{
    cache::EntityStore,
    credentials,
    error::{Error, ErrorKind},
    model::{DirectMessage, MessageId, Session, SubredditId, User, UserId, UserProfile},
    push::PushEvent,
};

use actor::{Actor, ActorContext, ActorPath, Handler, Message, Response};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use store::Repository;
use tracing::{debug, error, info};

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    Uninitialized,
    Registered,
    LoggedIn,
}

pub struct UserActor {
    id: UserId,
    state: UserState,
    users: EntityStore<User>,
    messages: Repository<DirectMessage>,
    session: Option<Session>,
    connected: bool,
}

impl UserActor {
    pub fn new(
        id: UserId,
        users: Repository<User>,
        messages: Repository<DirectMessage>,
    ) -> Self {
        Self {
            id,
            state: UserState::Uninitialized,
            users: EntityStore::new(users),
            messages,
            session: None,
            connected: false,
        }
    }

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn registered(&self) -> Result<(), Error> {
        match self.state {
            UserState::Uninitialized => {
                Err(Error::not_found(format!("user {} is not registered", self.id)))
            }
            UserState::Registered | UserState::LoggedIn => Ok(()),
        }
    }

    /// Persisted fields from the cache, volatile ones from the actor.
    fn profile(&self, user: &User) -> UserProfile {
        let mut profile = UserProfile::from(user);
        profile.connected = self.connected;
        profile
    }

    /// Accepts `token` if it is the live, unexpired session.
    fn check_session(&mut self, token: &str) -> Result<(), Error> {
        let (matches, expired) = match &self.session {
            Some(session) => (
                credentials::same_token(&session.token, token),
                session.expires_at <= Utc::now(),
            ),
            None => (false, false),
        };
        if expired {
            self.session = None;
            self.state = UserState::Registered;
            return Err(Error::unauthorized("session expired"));
        }
        if matches {
            Ok(())
        } else {
            Err(Error::unauthorized("invalid session token"))
        }
    }

    fn update<F>(&mut self, change: F) -> Result<UserProfile, Error>
    where
        F: FnOnce(&mut User) -> Result<(), Error>,
    {
        let key = self.key();
        let (user, ()) = self.users.modify(&key, change)?;
        Ok(self.profile(&user))
    }
}

#[derive(Debug, Clone)]
pub enum UserCommand {
    Register {
        username: String,
        email: String,
        password: String,
        initial_karma: i64,
    },
    Login {
        password: String,
        ttl: Duration,
    },
    Logout {
        token: String,
    },
    Authenticate {
        token: String,
    },
    GetProfile,
    ApplyKarma(i64),
    AddMembership(SubredditId),
    RemoveMembership(SubredditId),
    SetConnected(bool),
    StoreMessage(DirectMessage),
    /// Messages received, oldest first. Unread ones are marked read.
    Inbox,
}

impl Message for UserCommand {}

#[derive(Debug, Clone)]
pub enum UserResponse {
    Profile(UserProfile),
    Session(Session),
    Stored(DirectMessage),
    /// `newly_read` holds the messages persisted as read, even when a later write
    /// failed with `error`.
    Inbox {
        messages: Vec<DirectMessage>,
        newly_read: Vec<MessageId>,
        error: Option<Error>,
    },
    None,
}

impl Response for UserResponse {}

#[async_trait]
impl Actor for UserActor {
    type Message = UserCommand;
    type Event = PushEvent;
    type Response = UserResponse;
    type Error = Error;

    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        let key = self.key();
        match self.users.get(&key) {
            Ok(user) => {
                self.state = UserState::Registered;
                self.connected = user.connected;
                debug!("User actor {} resumed.", self.id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Handler<UserActor> for UserActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: UserCommand,
        _ctx: &mut ActorContext<UserActor>,
    ) -> Result<UserResponse, Error> {
        if !matches!(msg, UserCommand::Register { .. }) {
            self.registered()?;
        }

        match msg {
            UserCommand::Register {
                username,
                email,
                password,
                initial_karma,
            } => {
                if self.state != UserState::Uninitialized {
                    return Err(Error::duplicate(format!(
                        "user {} is already registered",
                        self.id
                    )));
                }
                let now = Utc::now();
                let user = self.users.create(User {
                    id: self.id,
                    username,
                    email,
                    password_hash: credentials::hash_password(&password),
                    karma: initial_karma,
                    connected: false,
                    last_active: now,
                    subreddits: BTreeSet::new(),
                    created_at: now,
                })?;
                self.state = UserState::Registered;
                info!("User {} registered.", self.id);
                Ok(UserResponse::Profile(self.profile(&user)))
            }
            UserCommand::Login { password, ttl } => {
                let user = self.users.get(&self.key())?;
                if !credentials::verify_password(&password, &user.password_hash)? {
                    return Err(Error::unauthorized("invalid credentials"));
                }
                let session = Session {
                    user_id: self.id,
                    token: credentials::new_token(),
                    expires_at: Utc::now() + ttl,
                };
                self.session = Some(session.clone());
                self.state = UserState::LoggedIn;
                debug!("User {} logged in.", self.id);
                Ok(UserResponse::Session(session))
            }
            UserCommand::Logout { token } => {
                self.check_session(&token)?;
                self.session = None;
                self.state = UserState::Registered;
                debug!("User {} logged out.", self.id);
                Ok(UserResponse::None)
            }
            UserCommand::Authenticate { token } => {
                self.check_session(&token)?;
                let user = self.users.get(&self.key())?;
                Ok(UserResponse::Profile(self.profile(&user)))
            }
            UserCommand::GetProfile => {
                // Another writer may have touched the record since it was cached.
                let user = self.users.refresh(&self.key())?;
                Ok(UserResponse::Profile(self.profile(&user)))
            }
            UserCommand::ApplyKarma(delta) => {
                let profile = self.update(|user| {
                    user.karma += delta;
                    Ok(())
                })?;
                Ok(UserResponse::Profile(profile))
            }
            UserCommand::AddMembership(subreddit) => {
                let profile = self.update(|user| {
                    user.subreddits.insert(subreddit);
                    Ok(())
                })?;
                Ok(UserResponse::Profile(profile))
            }
            UserCommand::RemoveMembership(subreddit) => {
                let profile = self.update(|user| {
                    user.subreddits.remove(&subreddit);
                    Ok(())
                })?;
                Ok(UserResponse::Profile(profile))
            }
            UserCommand::SetConnected(connected) => {
                let profile = self.update(|user| {
                    user.connected = connected;
                    user.last_active = Utc::now();
                    Ok(())
                })?;
                self.connected = connected;
                Ok(UserResponse::Profile(UserProfile { connected, ..profile }))
            }
            UserCommand::StoreMessage(message) => {
                if message.to != self.id {
                    return Err(Error::invalid_input(format!(
                        "message {} is not addressed to {}",
                        message.id, self.id
                    )));
                }
                self.messages.create(&message)?;
                Ok(UserResponse::Stored(message))
            }
            UserCommand::Inbox => {
                let mut messages =
                    self.messages.list_by("to", &self.id.to_string())?;
                messages.sort_by_key(|message| message.sent_at);
                let mut newly_read = Vec::new();
                let mut error = None;
                for message in messages.iter_mut().filter(|m| !m.read) {
                    message.read = true;
                    if let Err(e) = self.messages.upsert(message) {
                        error!("Can't mark message {} read: {}", message.id, e);
                        error = Some(Error::from(e));
                        break;
                    }
                    newly_read.push(message.id);
                }
                Ok(UserResponse::Inbox {
                    messages,
                    newly_read,
                    error,
                })
            }
        }
    }
}
