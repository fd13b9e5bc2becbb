// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor
//!
//! The `actor` module provides the `Actor` and `Handler` traits, the `ActorContext` handed to an
//! actor while it processes a message, and the `ActorRef` used by everyone else to reach it.
//!
//! An actor owns its state exclusively. All access goes through its mailbox, and the runner
//! handles one message at a time, so a handler never races with another handler of the same
//! actor. Two interaction styles exist:
//!
//! - `tell`: enqueue and return immediately. Nothing waits on the callee.
//! - `ask`: enqueue and wait for the response, bounded by the system's ask timeout. While an
//!   actor awaits an `ask` inside its own handler, its mailbox is not drained, so an actor must
//!   never `ask` something that may transitively `ask` it back.
//!

use crate::{
    ActorPath, Error,
    handler::HandleHelper,
    runner::{InnerSender, StopSender},
    system::SystemRef,
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{broadcast::Receiver as EventReceiver, oneshot};
use tracing::debug;

use std::{fmt::Debug, time::Duration};

/// Context handed to an actor on every lifecycle hook and message.
pub struct ActorContext<A: Actor + Handler<A>> {
    stop: StopSender,
    path: ActorPath,
    system: SystemRef,
    inner_sender: InnerSender<A>,
    child_senders: Vec<StopSender>,
}

impl<A> ActorContext<A>
where
    A: Actor + Handler<A>,
{
    pub(crate) fn new(
        stop: StopSender,
        path: ActorPath,
        system: SystemRef,
        inner_sender: InnerSender<A>,
    ) -> Self {
        Self {
            stop,
            path,
            system,
            inner_sender,
            child_senders: Vec::new(),
        }
    }

    /// Reference to the actor owning this context.
    pub async fn reference(&self) -> Option<ActorRef<A>> {
        self.system.get_actor(&self.path).await
    }

    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    pub fn system(&self) -> &SystemRef {
        &self.system
    }

    pub async fn parent<P: Actor + Handler<P>>(&self) -> Option<ActorRef<P>> {
        self.system.get_actor(&self.path.parent()).await
    }

    /// Stops every child, waiting for each one to acknowledge.
    pub(crate) async fn stop_childs(&mut self) {
        while let Some(sender) = self.child_senders.pop() {
            let (stop_sender, stop_receiver) = oneshot::channel();
            if sender.send(Some(stop_sender)).await.is_ok() {
                let _ = stop_receiver.await;
            }
        }
    }

    pub(crate) async fn remove_actor(&self) {
        self.system.remove_actor(&self.path).await;
    }

    /// Asks the runner to stop this actor once the current message is done.
    pub async fn stop(&self, sender: Option<oneshot::Sender<()>>) {
        debug!("Stopping actor {} from its context.", self.path);
        let _ = self.stop.send(sender).await;
    }

    /// Publishes an event to every subscriber of this actor.
    pub fn publish_event(&self, event: A::Event) -> Result<(), Error> {
        self.inner_sender
            .send(event)
            .map_err(|e| Error::SendEvent(e.to_string()))
    }

    /// Spawns a child actor at `<own path>/<name>`.
    pub async fn create_child<C>(
        &mut self,
        name: &str,
        actor: C,
    ) -> Result<ActorRef<C>, Error>
    where
        C: Actor + Handler<C>,
    {
        let path = self.path.clone() / name;
        let (actor_ref, stop_sender) =
            self.system.create_actor_path(path, actor).await?;
        self.child_senders.push(stop_sender);
        Ok(actor_ref)
    }

    pub async fn get_child<C>(&self, name: &str) -> Option<ActorRef<C>>
    where
        C: Actor + Handler<C>,
    {
        let path = self.path.clone() / name;
        self.system.get_actor(&path).await
    }
}

/// The `Actor` trait is the main trait that actors must implement.
#[async_trait]
pub trait Actor: Send + Sync + Sized + 'static + Handler<Self> {
    /// The type of messages this actor can receive.
    type Message: Message;

    /// The type of events this actor publishes.
    type Event: Event;

    /// The type of response this actor returns.
    type Response: Response;

    /// Domain error returned by the handler. Runtime failures (closed mailbox, ask timeout,
    /// failed start) are folded into it.
    type Error: std::error::Error + From<Error> + Send + Sync + 'static;

    /// Runs before the actor accepts its first message. An error aborts the start.
    async fn pre_start(
        &mut self,
        _context: &mut ActorContext<Self>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Runs when a stop is requested, before children are stopped.
    async fn pre_stop(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Runs after the actor has stopped.
    async fn post_stop(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Defines what an actor publishes on its event bus.
pub trait Event:
    Serialize + DeserializeOwned + Debug + Clone + Send + Sync + 'static
{
}

/// Defines what an actor will receive as its message.
pub trait Message: Send + Sync + 'static {}

/// Defines the response of a message.
pub trait Response: Send + Sync + 'static {}

impl Response for () {}

/// This is the trait that allows an actor to handle the messages that they receive.
#[async_trait]
pub trait Handler<A: Actor + Handler<A>>: Send + Sync {
    /// Handles one message. Only one call is in flight per actor at any time.
    async fn handle_message(
        &mut self,
        sender: ActorPath,
        msg: A::Message,
        ctx: &mut ActorContext<A>,
    ) -> Result<A::Response, A::Error>;
}

/// Actor reference.
pub struct ActorRef<A>
where
    A: Actor + Handler<A>,
{
    path: ActorPath,
    sender: HandleHelper<A>,
    event_receiver: EventReceiver<<A as Actor>::Event>,
    stop_sender: StopSender,
    ask_timeout: Duration,
}

impl<A> ActorRef<A>
where
    A: Actor + Handler<A>,
{
    pub(crate) fn new(
        path: ActorPath,
        sender: HandleHelper<A>,
        stop_sender: StopSender,
        event_receiver: EventReceiver<<A as Actor>::Event>,
        ask_timeout: Duration,
    ) -> Self {
        Self {
            path,
            sender,
            stop_sender,
            event_receiver,
            ask_timeout,
        }
    }

    /// Fire-and-forget.
    pub async fn tell(&self, message: A::Message) -> Result<(), Error> {
        self.sender.tell(self.path(), message)
    }

    /// Request/response bounded by the system's ask timeout.
    pub async fn ask(&self, message: A::Message) -> Result<A::Response, A::Error> {
        self.ask_with_timeout(message, self.ask_timeout).await
    }

    /// Request/response bounded by `timeout`.
    pub async fn ask_with_timeout(
        &self,
        message: A::Message,
        timeout: Duration,
    ) -> Result<A::Response, A::Error> {
        self.sender
            .ask(self.path(), &self.path, message, timeout)
            .await
    }

    /// Stops the actor and waits until it has stopped.
    pub async fn ask_stop(&self) -> Result<(), Error> {
        debug!("Stopping actor {} from handle reference.", self.path);
        let (response_sender, response_receiver) = oneshot::channel();
        if self.stop_sender.send(Some(response_sender)).await.is_err() {
            Ok(())
        } else {
            response_receiver
                .await
                .map_err(|error| Error::Send(error.to_string()))
        }
    }

    /// Stops the actor without waiting.
    pub async fn tell_stop(&self) {
        let _ = self.stop_sender.send(None).await;
    }

    pub fn path(&self) -> ActorPath {
        self.path.clone()
    }

    pub fn ask_timeout(&self) -> Duration {
        self.ask_timeout
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// New receiver on this actor's event bus. Only events published after the call are seen.
    pub fn subscribe(&self) -> EventReceiver<<A as Actor>::Event> {
        self.event_receiver.resubscribe()
    }
}

impl<A> Clone for ActorRef<A>
where
    A: Actor + Handler<A>,
{
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            sender: self.sender.clone(),
            stop_sender: self.stop_sender.clone(),
            event_receiver: self.event_receiver.resubscribe(),
            ask_timeout: self.ask_timeout,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::system::ActorSystem;

    use serde::{Deserialize, Serialize};
    use thiserror::Error as ThisError;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, ThisError)]
    enum CounterError {
        #[error("overflow")]
        Overflow,
        #[error(transparent)]
        Runtime(#[from] Error),
    }

    #[derive(Debug, Clone)]
    struct Counter {
        value: usize,
        limit: usize,
    }

    #[derive(Debug, Clone)]
    enum CounterMessage {
        Add(usize),
        Slow(Duration),
    }

    impl Message for CounterMessage {}

    #[derive(Debug, Clone, PartialEq)]
    struct CounterResponse(usize);

    impl Response for CounterResponse {}

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct CounterEvent(usize);

    impl Event for CounterEvent {}

    #[async_trait]
    impl Actor for Counter {
        type Message = CounterMessage;
        type Event = CounterEvent;
        type Response = CounterResponse;
        type Error = CounterError;
    }

    #[async_trait]
    impl Handler<Counter> for Counter {
        async fn handle_message(
            &mut self,
            _sender: ActorPath,
            msg: CounterMessage,
            ctx: &mut ActorContext<Counter>,
        ) -> Result<CounterResponse, CounterError> {
            match msg {
                CounterMessage::Add(value) => {
                    if self.value + value > self.limit {
                        return Err(CounterError::Overflow);
                    }
                    self.value += value;
                    ctx.publish_event(CounterEvent(self.value))?;
                }
                CounterMessage::Slow(duration) => {
                    tokio::time::sleep(duration).await;
                }
            }
            Ok(CounterResponse(self.value))
        }
    }

    #[tokio::test]
    async fn test_tell_then_ask_is_ordered() {
        let (system, _runner) = ActorSystem::create(CancellationToken::new());
        let actor_ref = system
            .create_root_actor("counter", Counter { value: 0, limit: 100 })
            .await
            .unwrap();
        let mut events = actor_ref.subscribe();

        actor_ref.tell(CounterMessage::Add(10)).await.unwrap();
        let response = actor_ref.ask(CounterMessage::Add(5)).await.unwrap();
        assert_eq!(response, CounterResponse(15));

        assert_eq!(events.recv().await.unwrap().0, 10);
        assert_eq!(events.recv().await.unwrap().0, 15);
        actor_ref.ask_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_handler_error_reaches_asker() {
        let (system, _runner) = ActorSystem::create(CancellationToken::new());
        let actor_ref = system
            .create_root_actor("bounded", Counter { value: 0, limit: 3 })
            .await
            .unwrap();

        let result = actor_ref.ask(CounterMessage::Add(4)).await;
        assert!(matches!(result, Err(CounterError::Overflow)));
        // The failed message left the state untouched.
        let response = actor_ref.ask(CounterMessage::Add(3)).await.unwrap();
        assert_eq!(response, CounterResponse(3));
    }

    #[tokio::test]
    async fn test_ask_times_out() {
        let (system, _runner) = ActorSystem::with_ask_timeout(
            CancellationToken::new(),
            Duration::from_millis(50),
        );
        let actor_ref = system
            .create_root_actor("slow", Counter { value: 0, limit: 10 })
            .await
            .unwrap();

        let result = actor_ref
            .ask(CounterMessage::Slow(Duration::from_millis(300)))
            .await;
        match result {
            Err(CounterError::Runtime(Error::Timeout(path, timeout))) => {
                assert_eq!(path, ActorPath::from("/user/slow"));
                assert_eq!(timeout, Duration::from_millis(50));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // A per-call timeout overrides the default.
        let response = actor_ref
            .ask_with_timeout(CounterMessage::Add(1), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(response, CounterResponse(1));
    }

    #[tokio::test]
    async fn test_stopped_actor_rejects_messages() {
        let (system, _runner) = ActorSystem::create(CancellationToken::new());
        let actor_ref = system
            .create_root_actor("stopped", Counter { value: 0, limit: 10 })
            .await
            .unwrap();
        actor_ref.ask_stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(system
            .get_actor::<Counter>(&ActorPath::from("/user/stopped"))
            .await
            .is_none());
        let result = actor_ref.ask(CounterMessage::Add(1)).await;
        assert!(matches!(result, Err(CounterError::Runtime(_))));
    }
}
