// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Core library for Rabble.
//! Re-exports the actor runtime, the storage layer and the domain engine (users, subreddits,
//! posts, comments, votes and feeds) behind one crate.
//! Storage backends other than the in-memory one are opt-in through features.

pub use actor::{
    Actor, ActorContext, ActorPath, ActorRef, ActorSystem, Error as ActorError, Event, Handler,
    Message, Response, Sink, Subscriber, SystemEvent, SystemRef, SystemRunner,
};

pub use store::{
    Error as StoreError, Record, Repository,
    database::{Collection, DbManager},
    memory::{MemoryManager, MemoryStore},
};

pub use engine::{
    Category, ContentEvent, Engine, EngineConfig, Envelope, Error, ErrorKind, PushEvent, Reply,
    Request, model,
};

#[cfg(feature = "sqlite")]
pub use sqlite_db::{SqliteCollection, SqliteManager};
