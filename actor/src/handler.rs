// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Mailbox
//!
//! Messages are boxed into handlers that carry an optional response channel. The runner pops
//! them one at a time, which is what serializes every mutation an actor performs.
//!

use crate::{
    ActorPath, Error,
    actor::{Actor, ActorContext, Handler},
};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use std::time::Duration;

/// Message handler trait for actors messages.
#[async_trait]
pub trait MessageHandler<A: Actor>: Send + Sync {
    /// Handles the message.
    async fn handle(&mut self, actor: &mut A, ctx: &mut ActorContext<A>);
}

type Rsvp<A> =
    oneshot::Sender<Result<<A as Actor>::Response, <A as Actor>::Error>>;

/// Internal actor message.
struct ActorMessage<A>
where
    A: Actor + Handler<A>,
{
    message: Option<A::Message>,
    sender: ActorPath,
    rsvp: Option<Rsvp<A>>,
}

impl<A> ActorMessage<A>
where
    A: Actor + Handler<A>,
{
    fn new(
        message: A::Message,
        sender: ActorPath,
        rsvp: Option<Rsvp<A>>,
    ) -> Self {
        Self {
            message: Some(message),
            sender,
            rsvp,
        }
    }
}

#[async_trait]
impl<A> MessageHandler<A> for ActorMessage<A>
where
    A: Actor + Handler<A>,
{
    async fn handle(&mut self, actor: &mut A, ctx: &mut ActorContext<A>) {
        let Some(message) = self.message.take() else {
            return;
        };
        let result = actor
            .handle_message(self.sender.clone(), message, ctx)
            .await;
        match self.rsvp.take() {
            Some(rsvp) => {
                // The asker may have given up already.
                if rsvp.send(result).is_err() {
                    debug!(
                        "Response for {} dropped, asker is gone.",
                        ctx.path()
                    );
                }
            }
            None => {
                if let Err(error) = result {
                    warn!(
                        "Message told to {} by {} failed: {}",
                        ctx.path(),
                        self.sender,
                        error
                    );
                }
            }
        }
    }
}

/// Boxed message handler.
pub type BoxedMessageHandler<A> = Box<dyn MessageHandler<A>>;

/// Mailbox receiver.
pub type MailboxReceiver<A> = mpsc::UnboundedReceiver<BoxedMessageHandler<A>>;

/// Mailbox sender.
pub type MailboxSender<A> = mpsc::UnboundedSender<BoxedMessageHandler<A>>;

/// Mailbox.
pub type Mailbox<A> = (MailboxSender<A>, MailboxReceiver<A>);

/// Mailbox factory.
pub fn mailbox<A: Actor + Handler<A>>() -> Mailbox<A> {
    mpsc::unbounded_channel()
}

/// Sending half of an actor mailbox.
pub struct HandleHelper<A: Actor + Handler<A>> {
    sender: MailboxSender<A>,
}

impl<A> HandleHelper<A>
where
    A: Actor + Handler<A>,
{
    pub(crate) fn new(sender: MailboxSender<A>) -> Self {
        Self { sender }
    }

    /// Enqueues a message without waiting for it to be processed.
    pub(crate) fn tell(
        &self,
        sender: ActorPath,
        message: A::Message,
    ) -> Result<(), Error> {
        let msg = ActorMessage::new(message, sender, None);
        self.sender.send(Box::new(msg)).map_err(|error| {
            debug!("Failed to tell message! {}", error);
            Error::Send(error.to_string())
        })
    }

    /// Enqueues a message and waits at most `timeout` for the response.
    ///
    /// On timeout the message stays queued; the callee may still process it.
    pub(crate) async fn ask(
        &self,
        sender: ActorPath,
        target: &ActorPath,
        message: A::Message,
        timeout: Duration,
    ) -> Result<A::Response, A::Error> {
        let (response_sender, response_receiver) = oneshot::channel();
        let msg = ActorMessage::new(message, sender, Some(response_sender));
        if let Err(error) = self.sender.send(Box::new(msg)) {
            error!("Failed to ask message to {}! {}", target, error);
            return Err(Error::Send(error.to_string()).into());
        }
        match tokio::time::timeout(timeout, response_receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                Err(Error::Receive(target.clone(), error.to_string()).into())
            }
            Err(_) => {
                debug!("Ask to {} timed out after {:?}.", target, timeout);
                Err(Error::Timeout(target.clone(), timeout).into())
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<A: Actor + Handler<A>> Clone for HandleHelper<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
