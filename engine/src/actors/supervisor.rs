// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # User supervisor
//!
//! Registry of user actors, living at `/user/users`. It is the only place that spawns a
//! [`UserActor`]: one child per user id, named after the id, created on registration or
//! lazily the first time a known user is addressed.
//!
//! Registrations are serialized by this mailbox, which is what keeps emails unique. Every push
//! notification is published on this actor's event bus.
//!

use crate::{
    actors::user::{UserActor, UserCommand, UserResponse},
    config::EngineConfig,
    error::{Error, ErrorKind},
    model::{DirectMessage, MessageId, Session, SubredditId, User, UserId, UserProfile},
    push::PushEvent,
    repos::Repositories,
};

use actor::{Actor, ActorContext, ActorPath, ActorRef, Handler, Message, Response};
use async_trait::async_trait;
use chrono::Utc;
use store::Repository;
use tracing::{debug, error, info, warn};

pub struct UserSupervisor {
    users: Repository<User>,
    messages: Repository<DirectMessage>,
    initial_karma: i64,
    session_ttl: chrono::Duration,
}

impl UserSupervisor {
    pub fn new(repos: &Repositories, config: &EngineConfig) -> Self {
        Self {
            users: repos.users.clone(),
            messages: repos.messages.clone(),
            initial_karma: config.initial_karma,
            session_ttl: config.session_ttl(),
        }
    }

    fn spawn_actor(&self, id: UserId) -> UserActor {
        UserActor::new(id, self.users.clone(), self.messages.clone())
    }

    /// Resident actor of `user`, spawning it if the user exists.
    async fn actor_for(
        &self,
        ctx: &mut ActorContext<UserSupervisor>,
        user: UserId,
    ) -> Result<ActorRef<UserActor>, Error> {
        let name = user.to_string();
        if let Some(actor) = ctx.get_child::<UserActor>(&name).await {
            return Ok(actor);
        }
        if !self.users.exists(&name)? {
            return Err(Error::not_found(format!("user {} not found", user)));
        }
        debug!("Spawning actor for user {}.", user);
        Ok(ctx.create_child(&name, self.spawn_actor(user)).await?)
    }

    async fn ask_user(
        &self,
        ctx: &mut ActorContext<UserSupervisor>,
        user: UserId,
        command: UserCommand,
    ) -> Result<UserResponse, Error> {
        let actor = self.actor_for(ctx, user).await?;
        actor.ask(command).await
    }

    async fn profile_of(
        &self,
        ctx: &mut ActorContext<UserSupervisor>,
        user: UserId,
        command: UserCommand,
    ) -> Result<UserProfile, Error> {
        match self.ask_user(ctx, user, command).await? {
            UserResponse::Profile(profile) => Ok(profile),
            other => Err(unexpected(&other)),
        }
    }

    async fn register(
        &self,
        ctx: &mut ActorContext<UserSupervisor>,
        username: String,
        email: String,
        password: String,
    ) -> Result<UserProfile, Error> {
        let username = username.trim().to_owned();
        let email = normalize_email(&email);
        if username.is_empty() || password.is_empty() {
            return Err(Error::invalid_input(
                "username and password are required",
            ));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(Error::invalid_input(format!(
                "'{}' is not an email address",
                email
            )));
        }
        match self.users.get_by_unique("email", &email) {
            Ok(_) => {
                return Err(Error::duplicate(format!(
                    "email {} is already registered",
                    email
                )));
            }
            Err(store::Error::EntryNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let id = UserId::new();
        let actor = ctx
            .create_child(&id.to_string(), self.spawn_actor(id))
            .await?;
        let result = actor
            .ask(UserCommand::Register {
                username,
                email,
                password,
                initial_karma: self.initial_karma,
            })
            .await;
        match result {
            Ok(UserResponse::Profile(profile)) => Ok(profile),
            Ok(other) => Err(unexpected(&other)),
            Err(e) => {
                // Leave no actor behind for an id that was never stored.
                if let Err(stop) = actor.ask_stop().await {
                    warn!("Actor of unregistered user {} not stopped: {}", id, stop);
                }
                Err(e)
            }
        }
    }

    async fn login(
        &self,
        ctx: &mut ActorContext<UserSupervisor>,
        email: String,
        password: String,
    ) -> Result<Session, Error> {
        let email = normalize_email(&email);
        let user = match self.users.get_by_unique("email", &email) {
            Ok(user) => user,
            Err(store::Error::EntryNotFound(_)) => {
                return Err(Error::unauthorized("invalid credentials"));
            }
            Err(e) => return Err(e.into()),
        };
        let command = UserCommand::Login {
            password,
            ttl: self.session_ttl,
        };
        match self.ask_user(ctx, user.id, command).await? {
            UserResponse::Session(session) => Ok(session),
            other => Err(unexpected(&other)),
        }
    }

    async fn send_message(
        &self,
        ctx: &mut ActorContext<UserSupervisor>,
        from: UserId,
        to: UserId,
        body: String,
    ) -> Result<DirectMessage, Error> {
        if body.trim().is_empty() {
            return Err(Error::invalid_input("message body is empty"));
        }
        if !self.users.exists(&from.to_string())? {
            return Err(Error::not_found(format!("user {} not found", from)));
        }
        let message = DirectMessage {
            id: MessageId::new(),
            from,
            to,
            body,
            sent_at: Utc::now(),
            read: false,
        };
        let stored = match self
            .ask_user(ctx, to, UserCommand::StoreMessage(message))
            .await?
        {
            UserResponse::Stored(message) => message,
            other => return Err(unexpected(&other)),
        };
        publish(
            ctx,
            PushEvent::MessageStored {
                recipient: to,
                message: stored.clone(),
            },
        );
        Ok(stored)
    }

    async fn inbox(
        &self,
        ctx: &mut ActorContext<UserSupervisor>,
        user: UserId,
    ) -> Result<Vec<DirectMessage>, Error> {
        match self.ask_user(ctx, user, UserCommand::Inbox).await? {
            UserResponse::Inbox {
                messages,
                newly_read,
                error,
            } => {
                for message in newly_read {
                    publish(
                        ctx,
                        PushEvent::MessageRead {
                            reader: user,
                            message,
                        },
                    );
                }
                match error {
                    Some(e) => Err(e),
                    None => Ok(messages),
                }
            }
            other => Err(unexpected(&other)),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn unexpected(response: &UserResponse) -> Error {
    error!("Unexpected user actor response: {:?}", response);
    Error::new(
        ErrorKind::ActorTimeout,
        "unexpected response from user actor",
    )
}

fn publish(ctx: &ActorContext<UserSupervisor>, event: PushEvent) {
    if let Err(e) = ctx.publish_event(event) {
        warn!("Push event not published: {}", e);
    }
}

#[derive(Debug, Clone)]
pub enum SupervisorCommand {
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
    GetProfile(UserId),
    /// One-way karma delta from a vote.
    ApplyKarma {
        user: UserId,
        delta: i64,
    },
    AddMembership {
        user: UserId,
        subreddit: SubredditId,
    },
    RemoveMembership {
        user: UserId,
        subreddit: SubredditId,
    },
    SetConnected {
        user: UserId,
        connected: bool,
    },
    SendMessage {
        from: UserId,
        to: UserId,
        body: String,
    },
    Inbox(UserId),
}

impl Message for SupervisorCommand {}

#[derive(Debug, Clone)]
pub enum SupervisorResponse {
    Profile(UserProfile),
    Session(Session),
    Message(DirectMessage),
    Messages(Vec<DirectMessage>),
    None,
}

impl Response for SupervisorResponse {}

#[async_trait]
impl Actor for UserSupervisor {
    type Message = SupervisorCommand;
    type Event = PushEvent;
    type Response = SupervisorResponse;
    type Error = Error;

    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        info!("User supervisor started at {}.", ctx.path());
        Ok(())
    }
}

#[async_trait]
impl Handler<UserSupervisor> for UserSupervisor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: SupervisorCommand,
        ctx: &mut ActorContext<UserSupervisor>,
    ) -> Result<SupervisorResponse, Error> {
        match msg {
            SupervisorCommand::Register {
                username,
                email,
                password,
            } => {
                let profile =
                    self.register(ctx, username, email, password).await?;
                Ok(SupervisorResponse::Profile(profile))
            }
            SupervisorCommand::Login { email, password } => {
                let session = self.login(ctx, email, password).await?;
                Ok(SupervisorResponse::Session(session))
            }
            SupervisorCommand::Logout { user, token } => {
                self.ask_user(ctx, user, UserCommand::Logout { token })
                    .await?;
                Ok(SupervisorResponse::None)
            }
            SupervisorCommand::Authenticate { user, token } => {
                let profile = self
                    .profile_of(ctx, user, UserCommand::Authenticate { token })
                    .await?;
                Ok(SupervisorResponse::Profile(profile))
            }
            SupervisorCommand::GetProfile(user) => {
                let profile =
                    self.profile_of(ctx, user, UserCommand::GetProfile).await?;
                Ok(SupervisorResponse::Profile(profile))
            }
            SupervisorCommand::ApplyKarma { user, delta } => {
                let profile = self
                    .profile_of(ctx, user, UserCommand::ApplyKarma(delta))
                    .await?;
                debug!("Karma of {} is now {}.", user, profile.karma);
                publish(
                    ctx,
                    PushEvent::KarmaChanged {
                        user,
                        karma: profile.karma,
                    },
                );
                Ok(SupervisorResponse::Profile(profile))
            }
            SupervisorCommand::AddMembership { user, subreddit } => {
                let profile = self
                    .profile_of(ctx, user, UserCommand::AddMembership(subreddit))
                    .await?;
                Ok(SupervisorResponse::Profile(profile))
            }
            SupervisorCommand::RemoveMembership { user, subreddit } => {
                let profile = self
                    .profile_of(
                        ctx,
                        user,
                        UserCommand::RemoveMembership(subreddit),
                    )
                    .await?;
                Ok(SupervisorResponse::Profile(profile))
            }
            SupervisorCommand::SetConnected { user, connected } => {
                let profile = self
                    .profile_of(ctx, user, UserCommand::SetConnected(connected))
                    .await?;
                Ok(SupervisorResponse::Profile(profile))
            }
            SupervisorCommand::SendMessage { from, to, body } => {
                let message = self.send_message(ctx, from, to, body).await?;
                Ok(SupervisorResponse::Message(message))
            }
            SupervisorCommand::Inbox(user) => {
                let messages = self.inbox(ctx, user).await?;
                Ok(SupervisorResponse::Messages(messages))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actor::ActorSystem;
    use store::memory::MemoryManager;
    use tokio_util::sync::CancellationToken;

    async fn supervisor() -> ActorRef<UserSupervisor> {
        let (system, _runner) = ActorSystem::create(CancellationToken::new());
        let repos = Repositories::open(&MemoryManager::default()).unwrap();
        system
            .create_root_actor(
                "users",
                UserSupervisor::new(&repos, &EngineConfig::default()),
            )
            .await
            .unwrap()
    }

    async fn register(
        users: &ActorRef<UserSupervisor>,
        email: &str,
    ) -> Result<UserProfile, Error> {
        match users
            .ask(SupervisorCommand::Register {
                username: "ada".to_owned(),
                email: email.to_owned(),
                password: "secret".to_owned(),
            })
            .await?
        {
            SupervisorResponse::Profile(profile) => Ok(profile),
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_email_is_unique_case_insensitively() {
        let users = supervisor().await;
        let profile = register(&users, "Ada@Example.com").await.unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.karma, 0);

        let error = register(&users, " ada@example.COM ").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Duplicate);
    }

    #[tokio::test]
    async fn test_invalid_registration() {
        let users = supervisor().await;
        let error = register(&users, "no-at-sign").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_login_checks_credentials() {
        let users = supervisor().await;
        let profile = register(&users, "ada@example.com").await.unwrap();

        let wrong = users
            .ask(SupervisorCommand::Login {
                email: "ada@example.com".to_owned(),
                password: "guess".to_owned(),
            })
            .await
            .unwrap_err();
        assert_eq!(wrong.kind(), ErrorKind::Unauthorized);

        let unknown = users
            .ask(SupervisorCommand::Login {
                email: "bob@example.com".to_owned(),
                password: "secret".to_owned(),
            })
            .await
            .unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::Unauthorized);

        let Ok(SupervisorResponse::Session(session)) = users
            .ask(SupervisorCommand::Login {
                email: "ada@example.com".to_owned(),
                password: "secret".to_owned(),
            })
            .await
        else {
            panic!("login failed");
        };
        assert_eq!(session.user_id, profile.id);

        let authenticated = users
            .ask(SupervisorCommand::Authenticate {
                user: profile.id,
                token: session.token.clone(),
            })
            .await;
        assert!(matches!(authenticated, Ok(SupervisorResponse::Profile(_))));

        users
            .ask(SupervisorCommand::Logout {
                user: profile.id,
                token: session.token.clone(),
            })
            .await
            .unwrap();
        let error = users
            .ask(SupervisorCommand::Authenticate {
                user: profile.id,
                token: session.token,
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_karma_delta_is_applied_and_pushed() {
        let users = supervisor().await;
        let profile = register(&users, "ada@example.com").await.unwrap();
        let mut events = users.subscribe();

        users
            .tell(SupervisorCommand::ApplyKarma {
                user: profile.id,
                delta: -3,
            })
            .await
            .unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            PushEvent::KarmaChanged {
                user: profile.id,
                karma: -3
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let users = supervisor().await;
        let error = users
            .ask(SupervisorCommand::GetProfile(UserId::new()))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }
}
