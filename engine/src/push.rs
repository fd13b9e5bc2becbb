// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Push notifications for a transport layer.
//!
//! The user supervisor publishes a [`PushEvent`] each time a direct message is stored or read
//! and each time a user's karma changes. A transport registers a `Subscriber<PushEvent>` with
//! `Engine::on_push`; delivery is at-least-once.

use crate::model::{DirectMessage, MessageId, UserId};

use actor::Event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PushEvent {
    MessageStored {
        recipient: UserId,
        message: DirectMessage,
    },
    MessageRead {
        reader: UserId,
        message: MessageId,
    },
    KarmaChanged {
        user: UserId,
        karma: i64,
    },
}

impl PushEvent {
    /// The user whose client should be notified.
    pub fn user(&self) -> UserId {
        match self {
            PushEvent::MessageStored { recipient, .. } => *recipient,
            PushEvent::MessageRead { reader, .. } => *reader,
            PushEvent::KarmaChanged { user, .. } => *user,
        }
    }
}

impl Event for PushEvent {}
