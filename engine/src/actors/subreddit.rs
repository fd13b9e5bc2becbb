// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Subreddit actor
//!
//! Owns every subreddit and its member set. Name uniqueness and membership changes are
//! decided here, one message at a time.
//!

use crate::{
    actors::ContentEvent,
    cache::EntityStore,
    error::Error,
    model::{Subreddit, SubredditId, UserId, name_key},
    repos::Repositories,
};

use actor::{Actor, ActorContext, ActorPath, Handler, Message, Response};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use std::collections::BTreeSet;

pub struct SubredditActor {
    subreddits: EntityStore<Subreddit>,
}

impl SubredditActor {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            subreddits: EntityStore::new(repos.subreddits.clone()),
        }
    }

    fn create(
        &mut self,
        name: String,
        description: String,
        creator: UserId,
    ) -> Result<Subreddit, Error> {
        let name = name.trim().to_owned();
        if name.is_empty() {
            return Err(Error::invalid_input("subreddit name is empty"));
        }
        let mut subreddit = Subreddit {
            id: SubredditId::new(),
            name,
            description,
            creator,
            members: BTreeSet::new(),
            member_count: 0,
            created_at: Utc::now(),
        };
        subreddit.add_member(creator);
        let subreddit = self.subreddits.create(subreddit)?;
        info!("Subreddit {} created as {}.", subreddit.name, subreddit.id);
        Ok(subreddit)
    }
}

#[derive(Debug, Clone)]
pub enum SubredditCommand {
    Create {
        name: String,
        description: String,
        creator: UserId,
    },
    Get(SubredditId),
    GetByName(String),
    Members(SubredditId),
    Join {
        subreddit: SubredditId,
        user: UserId,
    },
    Leave {
        subreddit: SubredditId,
        user: UserId,
    },
    /// Every subreddit, by name.
    List,
}

impl Message for SubredditCommand {}

#[derive(Debug, Clone)]
pub enum SubredditResponse {
    Subreddit(Subreddit),
    Members(BTreeSet<UserId>),
    Subreddits(std::vec::IntoIter<Subreddit>),
}

impl Response for SubredditResponse {}

#[async_trait]
impl Actor for SubredditActor {
    type Message = SubredditCommand;
    type Event = ContentEvent;
    type Response = SubredditResponse;
    type Error = Error;
}

#[async_trait]
impl Handler<SubredditActor> for SubredditActor {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: SubredditCommand,
        ctx: &mut ActorContext<SubredditActor>,
    ) -> Result<SubredditResponse, Error> {
        match msg {
            SubredditCommand::Create {
                name,
                description,
                creator,
            } => {
                let subreddit = self.create(name, description, creator)?;
                if let Err(e) = ctx.publish_event(ContentEvent::SubredditCreated {
                    subreddit: subreddit.id,
                }) {
                    warn!("Event not published: {}", e);
                }
                Ok(SubredditResponse::Subreddit(subreddit))
            }
            SubredditCommand::Get(id) => Ok(SubredditResponse::Subreddit(
                self.subreddits.get(&id.to_string())?,
            )),
            SubredditCommand::GetByName(name) => {
                Ok(SubredditResponse::Subreddit(
                    self.subreddits.get_by_unique("name", &name_key(&name))?,
                ))
            }
            SubredditCommand::Members(id) => {
                let subreddit = self.subreddits.get(&id.to_string())?;
                Ok(SubredditResponse::Members(subreddit.members))
            }
            SubredditCommand::Join { subreddit, user } => {
                let (subreddit, ()) =
                    self.subreddits.modify(&subreddit.to_string(), |s| {
                        if s.add_member(user) {
                            Ok(())
                        } else {
                            Err(Error::duplicate(format!(
                                "user {} is already a member of {}",
                                user, s.name
                            )))
                        }
                    })?;
                debug!("{} joined {}.", user, subreddit.name);
                Ok(SubredditResponse::Subreddit(subreddit))
            }
            SubredditCommand::Leave { subreddit, user } => {
                let (subreddit, ()) =
                    self.subreddits.modify(&subreddit.to_string(), |s| {
                        if s.remove_member(&user) {
                            Ok(())
                        } else {
                            Err(Error::invalid_input(format!(
                                "user {} is not a member of {}",
                                user, s.name
                            )))
                        }
                    })?;
                debug!("{} left {}.", user, subreddit.name);
                Ok(SubredditResponse::Subreddit(subreddit))
            }
            SubredditCommand::List => {
                let mut subreddits = self.subreddits.all()?;
                subreddits.sort_by_key(|s| name_key(&s.name));
                Ok(SubredditResponse::Subreddits(subreddits.into_iter()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    use store::memory::MemoryManager;

    fn actor() -> SubredditActor {
        SubredditActor::new(&Repositories::open(&MemoryManager::default()).unwrap())
    }

    #[test]
    fn test_creator_is_first_member() {
        let mut actor = actor();
        let creator = UserId::new();
        let subreddit = actor
            .create(" rust ".to_owned(), "crabs".to_owned(), creator)
            .unwrap();
        assert_eq!(subreddit.name, "rust");
        assert_eq!(subreddit.member_count, 1);
        assert!(subreddit.is_member(&creator));
    }

    #[test]
    fn test_names_are_unique() {
        let mut actor = actor();
        actor
            .create("Rust".to_owned(), String::new(), UserId::new())
            .unwrap();
        let error = actor
            .create("rust".to_owned(), String::new(), UserId::new())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Duplicate);

        let error = actor
            .create("  ".to_owned(), String::new(), UserId::new())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }
}
