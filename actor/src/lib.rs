// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runtime
//!
//! A small actor runtime on top of tokio. Every actor runs in its own task and processes its
//! mailbox one message at a time; actors only interact through `tell` (one-way) and `ask`
//! (request/response bounded by a timeout).
//!
//! ```ignore
//! let (system, mut runner) = ActorSystem::create(CancellationToken::new());
//! let posts = system.create_root_actor("posts", PostActor::new(repos)).await?;
//! let post = posts.ask(PostCommand::Get(id)).await?;
//! ```

mod actor;
mod error;
mod handler;
mod path;
mod runner;
mod sink;
mod system;

pub use actor::{
    Actor, ActorContext, ActorRef, Event, Handler, Message, Response,
};

pub use error::Error;

pub use path::ActorPath;

pub use sink::{Sink, Subscriber};

pub use system::{
    ActorSystem, DEFAULT_ASK_TIMEOUT, SystemEvent, SystemRef, SystemRunner,
};
