// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Security-focused tests for the SQLite backend

use sqlite_db::SqliteManager;
use store::{
    Error,
    database::{Collection, DbManager},
};
use tempfile::TempDir;

use std::{sync::Arc, thread};

#[test]
fn test_table_name_injection_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let manager =
        SqliteManager::new(temp_dir.path().to_str().unwrap()).unwrap();

    let malicious_names = vec![
        "users; DROP TABLE users",
        "users--",
        "users (prefix)",
        "\"users\"",
        "",
    ];
    for name in malicious_names {
        assert!(
            matches!(
                manager.create_collection(name, "prefix"),
                Err(Error::CreateStore(_))
            ),
            "accepted table name {:?}",
            name
        );
    }

    assert!(manager.create_collection("valid_name_123", "prefix").is_ok());
}

#[test]
fn test_keys_and_prefixes_are_bound_parameters() {
    let temp_dir = TempDir::new().unwrap();
    let manager =
        SqliteManager::new(temp_dir.path().to_str().unwrap()).unwrap();

    let hostile = manager
        .create_collection("posts", "x' OR '1'='1")
        .unwrap();
    let honest = manager.create_collection("posts", "records").unwrap();
    honest.put("secret", b"hidden").unwrap();

    assert!(hostile.get("secret").is_err());
    assert_eq!(hostile.iter(false).count(), 0);

    let key = "'; DELETE FROM posts; --";
    hostile.put(key, b"value").unwrap();
    assert_eq!(hostile.get(key).unwrap(), b"value");
    assert_eq!(honest.get("secret").unwrap(), b"hidden");
}

#[test]
fn test_binary_and_unicode_data() {
    let temp_dir = TempDir::new().unwrap();
    let manager =
        SqliteManager::new(temp_dir.path().to_str().unwrap()).unwrap();
    let collection = manager.create_collection("malformed", "prefix").unwrap();

    let cases = vec![
        ("key_with_nulls\x00\x00", vec![0, 1, 2, 3]),
        ("unicode_key_\u{1F680}", "\u{1F31F}".as_bytes().to_vec()),
        ("binary_key", vec![255, 254, 253, 0, 1, 2]),
        ("large", vec![42; 64 * 1024]),
    ];
    for (key, value) in cases {
        collection.put(key, &value).unwrap();
        assert_eq!(collection.get(key).unwrap(), value);
    }
}

#[test]
fn test_concurrent_access_safety() {
    let temp_dir = TempDir::new().unwrap();
    let manager =
        Arc::new(SqliteManager::new(temp_dir.path().to_str().unwrap()).unwrap());

    let mut handles = Vec::new();
    for i in 0..4u8 {
        let manager = Arc::clone(&manager);
        handles.push(thread::spawn(move || {
            // Every thread writes to the same collection.
            let collection =
                manager.create_collection("concurrent", "shared").unwrap();
            for j in 0..50u8 {
                let key = format!("key_{}_{}", i, j);
                collection.put(&key, &[i, j]).unwrap();
                assert_eq!(collection.get(&key).unwrap(), vec![i, j]);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let collection = manager.create_collection("concurrent", "shared").unwrap();
    assert_eq!(collection.iter(false).count(), 200);
    assert_eq!(collection.scan("key_3_").unwrap().len(), 50);
}
