// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor system
//!
//! The `system` module provides the `ActorSystem` type. The `ActorSystem` type is the responsible for
//! creating and managing actors.
//!

use crate::{
    Actor, ActorPath, ActorRef, Error, Event, Handler,
    runner::{ActorRunner, StopSender},
    sink::Sink,
};

use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error};

use std::{any::Any, collections::HashMap, sync::Arc, time::Duration};

/// Default bound on every `ask`.
pub const DEFAULT_ASK_TIMEOUT: Duration = Duration::from_secs(5);

/// Actor system.
pub struct ActorSystem {}

impl ActorSystem {
    /// Creates a new actor system with the default ask timeout.
    pub fn create(token: CancellationToken) -> (SystemRef, SystemRunner) {
        Self::with_ask_timeout(token, DEFAULT_ASK_TIMEOUT)
    }

    /// Creates a new actor system whose references time out `ask` calls after `ask_timeout`.
    pub fn with_ask_timeout(
        token: CancellationToken,
        ask_timeout: Duration,
    ) -> (SystemRef, SystemRunner) {
        let (event_sender, event_receiver) = mpsc::channel(100);
        let system = SystemRef::new(event_sender, token, ask_timeout);
        let runner = SystemRunner::new(event_receiver);
        (system, runner)
    }
}

/// System event.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Every root actor has been stopped.
    StopSystem,
}

/// Shared handle on the actor registry.
#[derive(Clone)]
pub struct SystemRef {
    actors:
        Arc<RwLock<HashMap<ActorPath, Box<dyn Any + Send + Sync + 'static>>>>,
    root_senders: Arc<RwLock<Vec<StopSender>>>,
    token: CancellationToken,
    ask_timeout: Duration,
}

impl SystemRef {
    /// Creates the registry and arms the shutdown task on `token`.
    pub fn new(
        event_sender: mpsc::Sender<SystemEvent>,
        token: CancellationToken,
        ask_timeout: Duration,
    ) -> Self {
        let root_senders = Arc::new(RwLock::new(Vec::<StopSender>::new()));
        let root_sender_clone = root_senders.clone();
        let token_clone = token.clone();
        let shutdown = async move {
            token_clone.cancelled().await;
            debug!("Stopping actor system...");
            let mut root_senders = root_sender_clone.write().await;
            while let Some(sender) = root_senders.pop() {
                let (stop_sender, stop_receiver) = oneshot::channel();
                if sender.send(Some(stop_sender)).await.is_ok() {
                    let _ = stop_receiver.await;
                }
            }
            let _ = event_sender.send(SystemEvent::StopSystem).await;
        };
        tokio::spawn(shutdown.in_current_span());
        SystemRef {
            actors: Arc::new(RwLock::new(HashMap::new())),
            root_senders,
            token,
            ask_timeout,
        }
    }

    pub fn ask_timeout(&self) -> Duration {
        self.ask_timeout
    }

    /// Looks up a live actor by path. `None` also when the actor at `path` has another type.
    pub async fn get_actor<A>(&self, path: &ActorPath) -> Option<ActorRef<A>>
    where
        A: Actor + Handler<A>,
    {
        let actors = self.actors.read().await;
        actors
            .get(path)
            .and_then(|any| any.downcast_ref::<ActorRef<A>>().cloned())
    }

    /// Registers and starts an actor, returning once `pre_start` has completed.
    pub(crate) async fn create_actor_path<A>(
        &self,
        path: ActorPath,
        actor: A,
    ) -> Result<(ActorRef<A>, StopSender), Error>
    where
        A: Actor + Handler<A>,
    {
        let (mut runner, actor_ref, stop_sender) = {
            let mut actors = self.actors.write().await;
            if actors.contains_key(&path) {
                error!("Actor '{}' already exists!", &path);
                return Err(Error::Exists(path));
            }
            let (runner, actor_ref, stop_sender) =
                ActorRunner::create(path.clone(), actor, self.ask_timeout);
            actors.insert(path.clone(), Box::new(actor_ref.clone()));
            (runner, actor_ref, stop_sender)
        };

        let system = self.clone();
        let (signal, started) = oneshot::channel();
        let stop_sender_clone = stop_sender.clone();
        // The actor task logs under the span of whoever created it.
        let task = async move {
            runner.init(system, stop_sender_clone, Some(signal)).await;
        };
        tokio::spawn(task.in_current_span());

        match started.await {
            Ok(Ok(())) => Ok((actor_ref, stop_sender)),
            Ok(Err(reason)) => Err(Error::Start(reason)),
            Err(e) => Err(Error::Start(format!("{}: {}", path, e))),
        }
    }

    /// Creates a root actor at `/user/<name>`.
    pub async fn create_root_actor<A>(
        &self,
        name: &str,
        actor: A,
    ) -> Result<ActorRef<A>, Error>
    where
        A: Actor + Handler<A>,
    {
        let path = ActorPath::from("/user") / name;
        let (actor_ref, stop_sender) =
            self.create_actor_path::<A>(path, actor).await?;
        let mut senders = self.root_senders.write().await;
        senders.push(stop_sender);
        Ok(actor_ref)
    }

    pub(crate) async fn remove_actor(&self, path: &ActorPath) {
        let mut actors = self.actors.write().await;
        actors.remove(path);
    }

    /// Cancels the system token, stopping every root actor and its children.
    pub fn stop_system(&self) {
        self.token.cancel();
    }

    /// Paths of the live direct children of `path`.
    pub async fn children(&self, path: &ActorPath) -> Vec<ActorPath> {
        let actors = self.actors.read().await;
        actors
            .keys()
            .filter(|actor| actor.is_child_of(path))
            .cloned()
            .collect()
    }

    /// Spawns a task driving `sink` until its event bus closes.
    pub async fn run_sink<E>(&self, mut sink: Sink<E>)
    where
        E: Event,
    {
        let task = async move {
            sink.run().await;
        };
        tokio::spawn(task.in_current_span());
    }
}

/// Waits for the system to stop.
pub struct SystemRunner {
    event_receiver: mpsc::Receiver<SystemEvent>,
}

impl SystemRunner {
    pub(crate) fn new(event_receiver: mpsc::Receiver<SystemEvent>) -> Self {
        Self { event_receiver }
    }

    /// Returns once the system has been stopped.
    pub async fn run(&mut self) {
        debug!("Running actor system...");
        if let Some(SystemEvent::StopSystem) = self.event_receiver.recv().await {
            debug!("Actor system stopped.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActorContext, Message, Response};

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use tracing_test::traced_test;

    #[derive(Debug)]
    struct Probe {
        fail_start: bool,
    }

    #[derive(Debug)]
    struct Ping;

    impl Message for Ping {}

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Nothing;

    impl Event for Nothing {}

    #[async_trait]
    impl Actor for Probe {
        type Message = Ping;
        type Event = Nothing;
        type Response = ();
        type Error = Error;

        async fn pre_start(
            &mut self,
            ctx: &mut ActorContext<Self>,
        ) -> Result<(), Error> {
            if self.fail_start {
                return Err(Error::Functional("refused".to_owned()));
            }
            if ctx.path().level() < 3 {
                ctx.create_child("child", Probe { fail_start: false })
                    .await?;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Handler<Probe> for Probe {
        async fn handle_message(
            &mut self,
            _sender: ActorPath,
            _msg: Ping,
            _ctx: &mut ActorContext<Probe>,
        ) -> Result<(), Error> {
            Ok(())
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_stop_actor_system() {
        let token = CancellationToken::new();
        let (system, mut runner) = ActorSystem::create(token.clone());
        system
            .create_root_actor("probe", Probe { fail_start: false })
            .await
            .unwrap();
        let handle = tokio::spawn(async move {
            runner.run().await;
        });

        token.cancel();
        handle.await.unwrap();
        assert!(logs_contain("Stopping actor system..."));
        assert!(logs_contain("Actor system stopped."));
        assert!(system
            .get_actor::<Probe>(&ActorPath::from("/user/probe/child"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_path_is_rejected() {
        let (system, _runner) = ActorSystem::create(CancellationToken::new());
        system
            .create_root_actor("probe", Probe { fail_start: false })
            .await
            .unwrap();
        let result = system
            .create_root_actor("probe", Probe { fail_start: false })
            .await;
        assert_eq!(
            result.err(),
            Some(Error::Exists(ActorPath::from("/user/probe")))
        );
        let children = system.children(&ActorPath::from("/user/probe")).await;
        assert_eq!(children, vec![ActorPath::from("/user/probe/child")]);
    }

    #[tokio::test]
    async fn test_failed_start_is_reported_and_unregistered() {
        let (system, _runner) = ActorSystem::create(CancellationToken::new());
        let result = system
            .create_root_actor("broken", Probe { fail_start: true })
            .await;
        assert!(matches!(result, Err(Error::Start(reason)) if reason.contains("refused")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(system
            .get_actor::<Probe>(&ActorPath::from("/user/broken"))
            .await
            .is_none());
    }
}
