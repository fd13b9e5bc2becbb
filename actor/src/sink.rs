// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Event sinks.
//!
//! A `Sink` pulls events from one actor's broadcast bus and hands each of them to a
//! `Subscriber`. Delivery is at-least-once per receiver while it keeps up; a lagging receiver
//! skips what it missed and carries on.

use crate::Event;

use async_trait::async_trait;
use tokio::sync::broadcast::{Receiver as EventReceiver, error::RecvError};
use tracing::{debug, warn};

/// Drives a subscriber from an event bus.
pub struct Sink<E: Event> {
    subscriber: Box<dyn Subscriber<E>>,
    event_receiver: EventReceiver<E>,
}

impl<E: Event> Sink<E> {
    pub fn new(
        event_receiver: EventReceiver<E>,
        subscriber: impl Subscriber<E>,
    ) -> Self {
        Sink {
            subscriber: Box::new(subscriber),
            event_receiver,
        }
    }

    /// Runs until the bus is closed.
    pub async fn run(&mut self) {
        loop {
            match self.event_receiver.recv().await {
                Ok(event) => {
                    debug!("Received event: {:?}. Notify to the subscriber.", event);
                    self.subscriber.notify(event).await;
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Sink lagged behind, {} events skipped.", skipped);
                }
            }
        }
    }
}

/// Receives the events of a sink.
#[async_trait]
pub trait Subscriber<E: Event>: Send + Sync + 'static {
    async fn notify(&self, event: E);
}
