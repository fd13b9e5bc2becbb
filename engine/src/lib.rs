// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rabble engine
//!
//! Users, subreddits, posts, comments and votes, each kind owned by one actor. The
//! [`Engine`] is the only entry point: it checks cross-actor rules (karma threshold,
//! membership) and forwards every operation to the owning actor.
//!
//! ```ignore
//! let manager = MemoryManager::default();
//! let (engine, _runner) =
//!     Engine::start(EngineConfig::default(), &manager, CancellationToken::new()).await?;
//! let ada = engine.register("ada", "ada@example.com", "secret").await?;
//! ```
//!

pub mod actors;
mod cache;
mod config;
mod credentials;
mod engine;
mod error;
mod feed;
pub mod model;
mod push;
mod repos;
mod request;
mod voting;

pub use actors::ContentEvent;
pub use cache::EntityStore;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Category, Error, ErrorKind};
pub use feed::{rank, score};
pub use push::PushEvent;
pub use repos::Repositories;
pub use request::{Envelope, Reply, Request};
pub use voting::{Votable, cast_vote};
