// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Vote and karma propagation
//!
//! One algorithm for every votable kind. The owning actor runs [`cast_vote`] inside its
//! mailbox, so the read of the voter's prior vote, the counter update and the persisted write
//! happen without interleaving for that target. The author's karma is then adjusted by a `tell`
//! to the user supervisor: the voter never waits on a user actor.
//!

use crate::{
    actors::{SupervisorCommand, UserSupervisor},
    cache::EntityStore,
    error::Error,
    model::{Comment, Post, Tally, UserId, VoteDirection},
};

use actor::ActorRef;
use store::Record;
use tracing::{debug, warn};

/// An entity users can vote on.
pub trait Votable: Record {
    fn tally(&self) -> &Tally;

    fn tally_mut(&mut self) -> &mut Tally;

    /// Receiver of the karma deltas.
    fn author(&self) -> UserId;

    /// False when the entity no longer takes votes.
    fn accepts_votes(&self) -> bool {
        true
    }
}

impl Votable for Post {
    fn tally(&self) -> &Tally {
        &self.tally
    }

    fn tally_mut(&mut self) -> &mut Tally {
        &mut self.tally
    }

    fn author(&self) -> UserId {
        self.author
    }
}

impl Votable for Comment {
    fn tally(&self) -> &Tally {
        &self.tally
    }

    fn tally_mut(&mut self) -> &mut Tally {
        &mut self.tally
    }

    fn author(&self) -> UserId {
        self.author
    }

    fn accepts_votes(&self) -> bool {
        !self.deleted
    }
}

/// Applies `direction` from `voter` to the entity under `key` and persists it, then notifies
/// the author's karma if the entity's karma moved.
///
/// Counters and the voter's record are one write; on failure nothing changed and no
/// notification is sent.
pub async fn cast_vote<T: Votable>(
    entities: &mut EntityStore<T>,
    users: Option<&ActorRef<UserSupervisor>>,
    key: &str,
    voter: UserId,
    direction: VoteDirection,
) -> Result<T, Error> {
    let (entity, delta) = entities.modify(key, |entity| {
        if !entity.accepts_votes() {
            return Err(Error::not_found(format!("{} is deleted", key)));
        }
        entity.tally_mut().apply(voter, direction)
    })?;
    debug!(
        "Vote {:?} by {} on {}: karma {} ({:+}).",
        direction,
        voter,
        key,
        entity.tally().karma,
        delta
    );

    if delta != 0 {
        notify_karma(users, entity.author(), delta).await;
    }
    Ok(entity)
}

/// One-way karma delta to `author`. Delivery failures are logged, never returned.
pub async fn notify_karma(
    users: Option<&ActorRef<UserSupervisor>>,
    author: UserId,
    delta: i64,
) {
    let Some(users) = users else {
        warn!("No user supervisor, karma {:+} for {} is lost.", delta, author);
        return;
    };
    if let Err(e) = users
        .tell(SupervisorCommand::ApplyKarma {
            user: author,
            delta,
        })
        .await
    {
        warn!("Karma {:+} for {} not delivered: {}", delta, author, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ErrorKind,
        model::{CommentId, PostId, SubredditId},
    };

    use chrono::Utc;
    use store::{Repository, memory::MemoryManager};
    use tracing_test::traced_test;

    fn comments() -> EntityStore<Comment> {
        EntityStore::new(
            Repository::new(&MemoryManager::default(), "comments").unwrap(),
        )
    }

    fn comment(deleted: bool) -> Comment {
        Comment {
            id: CommentId::new(),
            content: "first".to_owned(),
            author: UserId::new(),
            post: PostId::new(),
            subreddit: SubredditId::new(),
            parent: None,
            children: Vec::new(),
            deleted,
            created_at: Utc::now(),
            tally: Tally::default(),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_vote_is_persisted_before_notification() {
        let mut store = comments();
        let created = store.create(comment(false)).unwrap();
        let key = created.id.to_string();
        let voter = UserId::new();

        let voted = cast_vote(&mut store, None, &key, voter, VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(voted.karma(), 1);
        assert_eq!(
            store.repository().get(&key).unwrap().tally.vote_of(&voter),
            VoteDirection::Up
        );
        assert!(logs_contain("karma +1"));
    }

    #[tokio::test]
    async fn test_deleted_comment_rejects_votes() {
        let mut store = comments();
        let created = store.create(comment(true)).unwrap();
        let error = cast_vote(
            &mut store,
            None,
            &created.id.to_string(),
            UserId::new(),
            VoteDirection::Down,
        )
        .await
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(store.get(&created.id.to_string()).unwrap().karma(), 0);
    }
}
