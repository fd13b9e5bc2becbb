// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use crate::model::{MessageId, UserId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::Record;

/// Private message between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: MessageId,
    pub from: UserId,
    pub to: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

impl Record for DirectMessage {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn relations(&self) -> Vec<(&'static str, String)> {
        vec![("to", self.to.to_string())]
    }
}
