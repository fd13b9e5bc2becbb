// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!
//! Failures raised by the runtime itself, as opposed to the domain errors each actor returns from
//! its handler. Every actor error type must be constructible from this one so that a closed
//! mailbox or an expired `ask` reaches the caller through the same `Result`.
//!

use crate::ActorPath;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::time::Duration;

/// Error type for the actor system.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// The target mailbox is closed.
    #[error("An error occurred while sending a message to actor: {0}.")]
    Send(String),
    /// The responder was dropped before answering.
    #[error("An error occurred while receiving a message from {0}: {1}.")]
    Receive(ActorPath, String),
    /// The responder did not answer within the allowed time.
    #[error("Actor {0} did not answer within {1:?}.")]
    Timeout(ActorPath, Duration),
    /// An actor already lives at this path.
    #[error("Actor {0} exists.")]
    Exists(ActorPath),
    /// The actor failed its start hook.
    #[error("An error occurred while starting the actor: {0}.")]
    Start(String),
    /// The actor failed its stop hook.
    #[error("An error occurred while stopping an actor.")]
    Stop,
    /// An error occurred while sending an event to the event bus.
    #[error("An error occurred while sending an event to event bus: {0}.")]
    SendEvent(String),
    /// Error that does not compromise the operation of the system.
    #[error("Error: {0}")]
    Functional(String),
}

impl Error {
    /// True when the failure means the callee may never have seen the message or may still
    /// process it later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Send(_) | Error::Receive(..) | Error::Timeout(..)
        )
    }
}
