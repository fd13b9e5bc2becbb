// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runner
//!
//! Each actor runs inside its own `ActorRunner`, spawned as one tokio task. The runner walks the
//! actor through `Created → Started → Stopped → Terminated` (or `Created → Failed → Terminated`
//! when `pre_start` fails) and, while started, drains three sources in a select loop: stop
//! requests, events to broadcast, and the mailbox. Mailbox messages are handled strictly one
//! after another in arrival order.
//!

use crate::{
    ActorPath,
    actor::{Actor, ActorContext, ActorRef, Handler},
    handler::{HandleHelper, MailboxReceiver, mailbox},
    system::SystemRef,
};

use tokio::{
    select,
    sync::{
        broadcast::{self, Sender as EventSender},
        mpsc, oneshot,
    },
};
use tracing::{debug, error};

use std::time::Duration;

/// Channel carrying events from the context to the runner's broadcast bus.
pub type InnerSender<A> = mpsc::UnboundedSender<<A as Actor>::Event>;

pub type InnerReceiver<A> = mpsc::UnboundedReceiver<<A as Actor>::Event>;

pub type StopReceiver = mpsc::Receiver<Option<oneshot::Sender<()>>>;

pub type StopSender = mpsc::Sender<Option<oneshot::Sender<()>>>;

/// Start outcome reported back to whoever spawned the actor.
pub(crate) type StartSignal = oneshot::Sender<Result<(), String>>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ActorLifecycle {
    Created,
    Started,
    Stopped,
    Failed(String),
    Terminated,
}

pub(crate) struct ActorRunner<A: Actor> {
    path: ActorPath,
    actor: A,
    lifecycle: ActorLifecycle,
    receiver: MailboxReceiver<A>,
    event_sender: EventSender<A::Event>,
    stop_receiver: StopReceiver,
    inner_sender: InnerSender<A>,
    inner_receiver: InnerReceiver<A>,
}

impl<A> ActorRunner<A>
where
    A: Actor + Handler<A>,
{
    /// Creates the runner and the reference used to reach it.
    pub(crate) fn create(
        path: ActorPath,
        actor: A,
        ask_timeout: Duration,
    ) -> (Self, ActorRef<A>, StopSender) {
        debug!("Creating new actor runner for {}.", path);
        let (sender, receiver) = mailbox();
        let (stop_sender, stop_receiver) = mpsc::channel(100);
        let (event_sender, event_receiver) = broadcast::channel(10000);
        let (inner_sender, inner_receiver) = mpsc::unbounded_channel();
        let actor_ref = ActorRef::new(
            path.clone(),
            HandleHelper::new(sender),
            stop_sender.clone(),
            event_receiver,
            ask_timeout,
        );
        let runner = ActorRunner {
            path,
            actor,
            lifecycle: ActorLifecycle::Created,
            receiver,
            event_sender,
            stop_receiver,
            inner_sender,
            inner_receiver,
        };
        (runner, actor_ref, stop_sender)
    }

    /// Drives the actor through its whole life.
    pub(crate) async fn init(
        &mut self,
        system: SystemRef,
        stop_sender: StopSender,
        mut signal: Option<StartSignal>,
    ) {
        let mut ctx: ActorContext<A> = ActorContext::new(
            stop_sender,
            self.path.clone(),
            system,
            self.inner_sender.clone(),
        );

        loop {
            match &self.lifecycle {
                ActorLifecycle::Created => {
                    match self.actor.pre_start(&mut ctx).await {
                        Ok(()) => {
                            debug!("Actor {} has started.", &self.path);
                            self.lifecycle = ActorLifecycle::Started;
                        }
                        Err(err) => {
                            error!(
                                "Actor {} failed to start: {}",
                                &self.path, err
                            );
                            self.lifecycle =
                                ActorLifecycle::Failed(err.to_string());
                        }
                    }
                }
                ActorLifecycle::Started => {
                    if let Some(signal) = signal.take() {
                        let _ = signal.send(Ok(()));
                    }
                    self.run(&mut ctx).await;
                    self.lifecycle = ActorLifecycle::Stopped;
                }
                ActorLifecycle::Failed(reason) => {
                    if let Some(signal) = signal.take() {
                        let _ = signal.send(Err(reason.clone()));
                    }
                    self.lifecycle = ActorLifecycle::Terminated;
                }
                ActorLifecycle::Stopped => {
                    if let Err(err) = self.actor.post_stop(&mut ctx).await {
                        error!("Actor {} failed to stop: {}", &self.path, err);
                    }
                    self.lifecycle = ActorLifecycle::Terminated;
                }
                ActorLifecycle::Terminated => {
                    debug!("Actor {} is terminated.", &self.path);
                    ctx.remove_actor().await;
                    break;
                }
            }
        }
        self.receiver.close();
    }

    /// Message loop. Returns once a stop has been processed.
    async fn run(&mut self, ctx: &mut ActorContext<A>) {
        let mut mailbox_closed = false;
        loop {
            select! {
                stop = self.stop_receiver.recv() => {
                    debug!("Stopping actor {}.", &self.path);
                    if let Err(err) = self.actor.pre_stop(ctx).await {
                        error!("Actor {} pre-stop failed: {}", &self.path, err);
                    }
                    ctx.stop_childs().await;
                    ctx.remove_actor().await;
                    if let Some(Some(ack)) = stop {
                        let _ = ack.send(());
                    }
                    break;
                }
                Some(event) = self.inner_receiver.recv() => {
                    // No subscribers is not an error.
                    if let Ok(size) = self.event_sender.send(event) {
                        debug!("Event sent to {} subscribers.", size);
                    }
                }
                msg = self.receiver.recv(), if !mailbox_closed => {
                    match msg {
                        Some(mut msg) => msg.handle(&mut self.actor, ctx).await,
                        None => {
                            mailbox_closed = true;
                            ctx.stop(None).await;
                        }
                    }
                }
            }
        }
    }
}
