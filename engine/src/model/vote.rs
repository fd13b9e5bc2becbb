// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Vote bookkeeping carried by every votable entity.

use crate::{error::Error, model::UserId};

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
    /// No vote. Submitting it removes the voter's current vote.
    #[default]
    None,
}

impl VoteDirection {
    /// Karma contributed by one vote in this direction.
    fn weight(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
            VoteDirection::None => 0,
        }
    }
}

/// Aggregate counters plus the live vote of every voter.
///
/// `karma == upvotes - downvotes` holds after every [`Tally::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub upvotes: u64,
    pub downvotes: u64,
    pub karma: i64,
    pub votes: BTreeMap<UserId, VoteDirection>,
}

impl Tally {
    pub fn vote_of(&self, voter: &UserId) -> VoteDirection {
        self.votes.get(voter).copied().unwrap_or_default()
    }

    /// Moves `voter` to `direction` and returns the karma delta.
    ///
    /// The prior vote is reversed before the new one counts. Resubmitting the current
    /// direction is `Duplicate` and leaves the tally untouched.
    pub fn apply(
        &mut self,
        voter: UserId,
        direction: VoteDirection,
    ) -> Result<i64, Error> {
        let prior = self.vote_of(&voter);
        if prior == direction {
            return Err(Error::duplicate(format!(
                "user {} already holds a {:?} vote here",
                voter, direction
            )));
        }

        match prior {
            VoteDirection::Up => self.upvotes = self.upvotes.saturating_sub(1),
            VoteDirection::Down => {
                self.downvotes = self.downvotes.saturating_sub(1)
            }
            VoteDirection::None => {}
        }
        match direction {
            VoteDirection::Up => self.upvotes += 1,
            VoteDirection::Down => self.downvotes += 1,
            VoteDirection::None => {}
        }

        let delta = direction.weight() - prior.weight();
        self.karma += delta;
        if direction == VoteDirection::None {
            self.votes.remove(&voter);
        } else {
            self.votes.insert(voter, direction);
        }
        Ok(delta)
    }
}
