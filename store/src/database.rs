// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Database abstraction
//!
//! A backend provides a [`DbManager`] that hands out [`Collection`]s. A collection is an ordered
//! key/value space identified by a name and a prefix; two collections with the same name and
//! prefix obtained from the same manager see the same data.
//!
//! Collections use interior mutability. Repositories share one collection between every actor
//! that reads or writes a given entity kind, and a successful `put` must be durable when it
//! returns.

use crate::error::Error;

/// Factory of collections for one backend.
pub trait DbManager<C>: Sync + Send + Clone
where
    C: Collection + 'static,
{
    /// Opens (creating if needed) the collection `name` scoped to `prefix`.
    fn create_collection(&self, name: &str, prefix: &str) -> Result<C, Error>;

    /// Releases the backend.
    fn stop(self) -> Result<(), Error> {
        Ok(())
    }
}

/// Ordered key/value collection.
pub trait Collection: Sync + Send + 'static {
    /// Collection name.
    fn name(&self) -> &str;

    /// Value under `key`, or `EntryNotFound`.
    fn get(&self, key: &str) -> Result<Vec<u8>, Error>;

    /// Inserts or replaces the value under `key`.
    fn put(&self, key: &str, data: &[u8]) -> Result<(), Error>;

    /// Removes `key`. Removing a missing key is `EntryNotFound`.
    fn del(&self, key: &str) -> Result<(), Error>;

    /// Removes every entry.
    fn purge(&self) -> Result<(), Error>;

    /// Iterates the entries in key order, or reverse key order.
    fn iter<'a>(
        &'a self,
        reverse: bool,
    ) -> Box<dyn Iterator<Item = (String, Vec<u8>)> + 'a>;

    /// Entries whose key starts with `prefix`, in key order.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, Error> {
        Ok(self
            .iter(false)
            .filter(|(key, _)| key.starts_with(prefix))
            .collect())
    }

    /// Entry with the greatest key.
    fn last(&self) -> Option<(String, Vec<u8>)> {
        self.iter(true).next()
    }

    /// Forces buffered writes down to the backend.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Conformance suite for a backend: `test_store_trait! { name: Manager: Collection }`.
/// The manager must implement `Default`.
#[macro_export]
macro_rules! test_store_trait {
    ($name:ident: $type:ty: $type2:ty) => {
        #[cfg(test)]
        mod $name {
            use super::*;
            use $crate::database::{Collection, DbManager};
            use $crate::error::Error;

            #[test]
            fn test_create_collection() {
                let manager = <$type>::default();
                let store: $type2 =
                    manager.create_collection("test", "test").unwrap();
                assert_eq!(Collection::name(&store), "test");
                assert!(manager.stop().is_ok())
            }

            #[test]
            fn test_put_get_collection() {
                let manager = <$type>::default();
                let store: $type2 =
                    manager.create_collection("test", "test").unwrap();
                store.put("key", b"value").unwrap();
                assert_eq!(store.get("key").unwrap(), b"value");
                store.put("key", b"other").unwrap();
                assert_eq!(store.get("key").unwrap(), b"other");
                assert!(manager.stop().is_ok())
            }

            #[test]
            fn test_del_collection() {
                let manager = <$type>::default();
                let store: $type2 =
                    manager.create_collection("test", "test").unwrap();
                store.put("key", b"value").unwrap();
                store.del("key").unwrap();
                assert!(matches!(
                    store.get("key"),
                    Err(Error::EntryNotFound(_))
                ));
                assert!(matches!(
                    store.del("key"),
                    Err(Error::EntryNotFound(_))
                ));
                assert!(manager.stop().is_ok())
            }

            #[test]
            fn test_prefixes_are_isolated() {
                let manager = <$type>::default();
                let left: $type2 =
                    manager.create_collection("test", "left").unwrap();
                let right: $type2 =
                    manager.create_collection("test", "right").unwrap();
                left.put("key", b"left").unwrap();
                assert!(right.get("key").is_err());
                right.put("key", b"right").unwrap();
                assert_eq!(left.get("key").unwrap(), b"left");
                assert_eq!(right.iter(false).count(), 1);
                assert!(manager.stop().is_ok())
            }

            #[test]
            fn test_shared_collection() {
                let manager = <$type>::default();
                let writer: $type2 =
                    manager.create_collection("test", "shared").unwrap();
                let reader: $type2 =
                    manager.create_collection("test", "shared").unwrap();
                writer.put("key", b"value").unwrap();
                assert_eq!(reader.get("key").unwrap(), b"value");
                assert!(manager.stop().is_ok())
            }

            #[test]
            fn test_iter() {
                let manager = <$type>::default();
                let store: $type2 =
                    manager.create_collection("test", "test").unwrap();
                store.put("key1", b"value1").unwrap();
                store.put("key3", b"value3").unwrap();
                store.put("key2", b"value2").unwrap();
                let keys: Vec<String> =
                    store.iter(false).map(|(key, _)| key).collect();
                assert_eq!(keys, vec!["key1", "key2", "key3"]);
                let keys: Vec<String> =
                    store.iter(true).map(|(key, _)| key).collect();
                assert_eq!(keys, vec!["key3", "key2", "key1"]);
                assert_eq!(
                    store.last(),
                    Some(("key3".to_string(), b"value3".to_vec()))
                );
                assert!(manager.stop().is_ok())
            }

            #[test]
            fn test_scan() {
                let manager = <$type>::default();
                let store: $type2 =
                    manager.create_collection("test", "test").unwrap();
                store.put("post:a:1", b"1").unwrap();
                store.put("post:a:2", b"2").unwrap();
                store.put("post:ab:3", b"3").unwrap();
                store.put("post:b:4", b"4").unwrap();
                let found = store.scan("post:a:").unwrap();
                assert_eq!(
                    found,
                    vec![
                        ("post:a:1".to_string(), b"1".to_vec()),
                        ("post:a:2".to_string(), b"2".to_vec()),
                    ]
                );
                assert!(store.scan("comment:").unwrap().is_empty());
                assert!(manager.stop().is_ok())
            }

            #[test]
            fn test_purge_collection() {
                let manager = <$type>::default();
                let store: $type2 =
                    manager.create_collection("test", "test").unwrap();
                let other: $type2 =
                    manager.create_collection("test", "other").unwrap();
                store.put("key1", b"value1").unwrap();
                store.put("key2", b"value2").unwrap();
                other.put("key1", b"kept").unwrap();
                store.purge().unwrap();
                assert_eq!(store.iter(false).count(), 0);
                assert_eq!(other.get("key1").unwrap(), b"kept");
                assert!(manager.stop().is_ok())
            }
        }
    };
}
