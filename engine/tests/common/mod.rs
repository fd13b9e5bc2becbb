// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use actor::Subscriber;
use async_trait::async_trait;
use engine::{
    ContentEvent, Engine, EngineConfig, PushEvent,
    model::{Post, PostId, Subreddit, UserId, UserProfile, VoteDirection},
};
use store::{
    Error as StoreError,
    database::{Collection, DbManager},
    memory::{MemoryManager, MemoryStore},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

/// Engine over a fresh in-memory backend.
pub async fn start(config: EngineConfig) -> (Engine, MemoryManager) {
    let manager = MemoryManager::default();
    let engine = start_on(config, &manager).await;
    (engine, manager)
}

pub async fn start_on(config: EngineConfig, manager: &MemoryManager) -> Engine {
    let (engine, _runner) =
        Engine::start(config, manager, CancellationToken::new())
            .await
            .unwrap();
    engine
}

/// In-memory backend whose writes can be made to fail once.
#[derive(Clone, Default)]
pub struct FlakyManager {
    inner: MemoryManager,
    fault: Arc<Mutex<Option<Fault>>>,
}

struct Fault {
    collection: String,
    passes: usize,
}

impl FlakyManager {
    /// After `passes` more successful puts on `collection`, the next put fails. Only once.
    pub fn fail_put(&self, collection: &str, passes: usize) {
        *self.fault.lock().unwrap() = Some(Fault {
            collection: collection.to_owned(),
            passes,
        });
    }

    pub fn armed(&self) -> bool {
        self.fault.lock().unwrap().is_some()
    }
}

impl DbManager<FlakyCollection> for FlakyManager {
    fn create_collection(
        &self,
        name: &str,
        prefix: &str,
    ) -> Result<FlakyCollection, StoreError> {
        Ok(FlakyCollection {
            inner: self.inner.create_collection(name, prefix)?,
            fault: self.fault.clone(),
        })
    }
}

pub struct FlakyCollection {
    inner: MemoryStore,
    fault: Arc<Mutex<Option<Fault>>>,
}

impl Collection for FlakyCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut fault = self.fault.lock().unwrap();
        if let Some(armed) = fault.as_mut() {
            if armed.collection == self.inner.name() {
                if armed.passes == 0 {
                    *fault = None;
                    return Err(StoreError::Store("injected failure".to_owned()));
                }
                armed.passes -= 1;
            }
        }
        drop(fault);
        self.inner.put(key, data)
    }

    fn del(&self, key: &str) -> Result<(), StoreError> {
        self.inner.del(key)
    }

    fn purge(&self) -> Result<(), StoreError> {
        self.inner.purge()
    }

    fn iter<'a>(
        &'a self,
        reverse: bool,
    ) -> Box<dyn Iterator<Item = (String, Vec<u8>)> + 'a> {
        self.inner.iter(reverse)
    }
}

/// Engine over a backend that fails on demand.
pub async fn start_flaky(config: EngineConfig) -> (Engine, FlakyManager) {
    let manager = FlakyManager::default();
    let (engine, _runner) =
        Engine::start(config, &manager, CancellationToken::new())
            .await
            .unwrap();
    (engine, manager)
}

/// Users start with enough karma to create subreddits.
pub fn rich_config() -> EngineConfig {
    EngineConfig {
        initial_karma: 100,
        ..EngineConfig::default()
    }
}

pub async fn register(engine: &Engine, name: &str) -> UserProfile {
    engine
        .register(name, &format!("{}@example.com", name), "secret")
        .await
        .unwrap()
}

/// A subreddit owned by a fresh user, plus a post of that user in it.
pub async fn subreddit_with_post(
    engine: &Engine,
    owner: &str,
) -> (UserProfile, Subreddit, Post) {
    let owner = register(engine, owner).await;
    let subreddit = engine
        .create_subreddit(owner.id, &format!("{}-sub", owner.username), "")
        .await
        .unwrap();
    let post = engine
        .create_post(owner.id, subreddit.id, "hello", "first post")
        .await
        .unwrap();
    (owner, subreddit, post)
}

/// Registers `count` voters and makes each vote `direction` on `post`.
pub async fn votes(
    engine: &Engine,
    prefix: &str,
    count: usize,
    post: PostId,
    direction: VoteDirection,
) {
    for i in 0..count {
        let voter = register(engine, &format!("{}{}", prefix, i)).await;
        engine.vote_post(voter.id, post, direction).await.unwrap();
    }
}

/// Karma is propagated one-way; poll until it settles on `expected` or give up.
pub async fn karma_eventually(engine: &Engine, user: UserId, expected: i64) -> i64 {
    let mut karma = engine.profile(user).await.unwrap().karma;
    for _ in 0..100 {
        if karma == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        karma = engine.profile(user).await.unwrap().karma;
    }
    karma
}

/// Push subscriber forwarding into a channel.
pub struct Collect(pub mpsc::UnboundedSender<PushEvent>);

#[async_trait]
impl Subscriber<PushEvent> for Collect {
    async fn notify(&self, event: PushEvent) {
        let _ = self.0.send(event);
    }
}

pub async fn push_channel(engine: &Engine) -> mpsc::UnboundedReceiver<PushEvent> {
    let (sender, receiver) = mpsc::unbounded_channel();
    engine.on_push(Collect(sender)).await;
    receiver
}

/// Content subscriber forwarding into a channel.
#[derive(Clone)]
pub struct CollectContent(pub mpsc::UnboundedSender<ContentEvent>);

#[async_trait]
impl Subscriber<ContentEvent> for CollectContent {
    async fn notify(&self, event: ContentEvent) {
        let _ = self.0.send(event);
    }
}

pub async fn content_channel(engine: &Engine) -> mpsc::UnboundedReceiver<ContentEvent> {
    let (sender, receiver) = mpsc::unbounded_channel();
    engine.on_content(CollectContent(sender)).await;
    receiver
}

/// Next push event matching `filter`, skipping others.
pub async fn next_push<F>(
    receiver: &mut mpsc::UnboundedReceiver<PushEvent>,
    filter: F,
) -> PushEvent
where
    F: Fn(&PushEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
            .await
            .expect("no push event in time")
            .expect("push channel closed");
        if filter(&event) {
            return event;
        }
    }
}
