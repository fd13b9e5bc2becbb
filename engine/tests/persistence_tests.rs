// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::{karma_eventually, rich_config};
use engine::{Engine, ErrorKind, model::VoteDirection};

use sqlite_db::SqliteManager;
use store::database::DbManager;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap().to_owned();

    let manager = SqliteManager::new(&path).unwrap();
    let token = CancellationToken::new();
    let (engine, mut runner) =
        Engine::start(rich_config(), &manager, token.clone())
            .await
            .unwrap();
    let ada = engine
        .register("ada", "ada@example.com", "secret")
        .await
        .unwrap();
    let bob = engine
        .register("bob", "bob@example.com", "hunter2")
        .await
        .unwrap();
    let subreddit = engine.create_subreddit(ada.id, "rust", "").await.unwrap();
    engine.join_subreddit(bob.id, subreddit.id).await.unwrap();
    let post = engine
        .create_post(ada.id, subreddit.id, "hello", "world")
        .await
        .unwrap();
    let comment = engine
        .create_comment(bob.id, post.id, None, "hi")
        .await
        .unwrap();
    engine
        .vote_post(bob.id, post.id, VoteDirection::Up)
        .await
        .unwrap();
    engine.send_message(bob.id, ada.id, "welcome?").await.unwrap();
    assert_eq!(karma_eventually(&engine, ada.id, 101).await, 101);

    token.cancel();
    runner.run().await;
    manager.stop().unwrap();

    let manager = SqliteManager::new(&path).unwrap();
    let (engine, _runner) =
        Engine::start(rich_config(), &manager, CancellationToken::new())
            .await
            .unwrap();

    let session = engine.login("bob@example.com", "hunter2").await.unwrap();
    assert_eq!(session.user_id, bob.id);
    assert_eq!(engine.profile(ada.id).await.unwrap().karma, 101);

    let subreddit = engine.subreddit_by_name("rust").await.unwrap();
    assert!(subreddit.is_member(&ada.id));
    assert!(subreddit.is_member(&bob.id));
    assert!(
        engine
            .profile(bob.id)
            .await
            .unwrap()
            .subreddits
            .contains(&subreddit.id)
    );

    let post = engine.post(post.id).await.unwrap();
    assert_eq!(post.karma(), 1);
    assert_eq!(post.comment_count, 1);
    let comments: Vec<_> = engine.list_comments(post.id).await.unwrap().collect();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, comment.id);

    let inbox = engine.inbox(ada.id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].body, "welcome?");

    // The unique email index was reloaded too.
    let error = engine
        .register("ada", "ada@example.com", "again")
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Duplicate);
}
