// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Mailbox ordering and child supervision tests.

use actor::{
    Actor, ActorContext, ActorPath, ActorRef, ActorSystem, Error, Event,
    Handler, Message, Response,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

// Read-modify-write register, deliberately yielding between read and write.
#[derive(Debug, Default)]
struct Register {
    value: u64,
    history: Vec<u64>,
}

#[derive(Debug)]
enum RegisterCommand {
    Increment,
    Append(u64),
    Read,
}

impl Message for RegisterCommand {}

#[derive(Debug, PartialEq)]
enum RegisterResponse {
    Value(u64),
    History(Vec<u64>),
}

impl Response for RegisterResponse {}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegisterEvent;

impl Event for RegisterEvent {}

#[async_trait]
impl Actor for Register {
    type Message = RegisterCommand;
    type Event = RegisterEvent;
    type Response = RegisterResponse;
    type Error = Error;
}

#[async_trait]
impl Handler<Register> for Register {
    async fn handle_message(
        &mut self,
        _sender: ActorPath,
        msg: RegisterCommand,
        _ctx: &mut ActorContext<Register>,
    ) -> Result<RegisterResponse, Error> {
        match msg {
            RegisterCommand::Increment => {
                let read = self.value;
                tokio::task::yield_now().await;
                self.value = read + 1;
                Ok(RegisterResponse::Value(self.value))
            }
            RegisterCommand::Append(value) => {
                self.history.push(value);
                Ok(RegisterResponse::History(self.history.clone()))
            }
            RegisterCommand::Read => Ok(RegisterResponse::Value(self.value)),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_asks_never_lose_updates() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let register: ActorRef<Register> = system
        .create_root_actor("register", Register::default())
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let register = register.clone();
        tasks.push(tokio::spawn(async move {
            register.ask(RegisterCommand::Increment).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let response = register.ask(RegisterCommand::Read).await.unwrap();
    assert_eq!(response, RegisterResponse::Value(50));
}

#[tokio::test]
async fn test_tells_from_one_sender_are_fifo() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let register: ActorRef<Register> = system
        .create_root_actor("history", Register::default())
        .await
        .unwrap();

    for value in 0..20 {
        register.tell(RegisterCommand::Append(value)).await.unwrap();
    }
    let response = register.ask(RegisterCommand::Append(20)).await.unwrap();
    assert_eq!(response, RegisterResponse::History((0..=20).collect()));
}

#[tokio::test]
async fn test_stop_is_acknowledged_and_path_is_freed() {
    let (system, _runner) = ActorSystem::create(CancellationToken::new());
    let register: ActorRef<Register> = system
        .create_root_actor("reusable", Register::default())
        .await
        .unwrap();
    register.ask_stop().await.unwrap();

    let again: ActorRef<Register> = system
        .create_root_actor("reusable", Register::default())
        .await
        .unwrap();
    let response = again.ask(RegisterCommand::Read).await.unwrap();
    assert_eq!(response, RegisterResponse::Value(0));
}
