// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! In-memory backend.
//!
//! Data lives as long as the manager (and its clones). Used by tests and by deployments that
//! accept losing everything on restart.

use crate::{
    database::{Collection, DbManager},
    error::Error,
};

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

type Entries = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

type MemoryData = Arc<RwLock<HashMap<(String, String), Entries>>>;

#[derive(Default, Clone)]
pub struct MemoryManager {
    data: MemoryData,
}

impl DbManager<MemoryStore> for MemoryManager {
    fn create_collection(
        &self,
        name: &str,
        prefix: &str,
    ) -> Result<MemoryStore, Error> {
        let mut data_lock = self.data.write().map_err(|e| {
            Error::Store(format!("Can not lock manager data: {}", e))
        })?;
        let entries = data_lock
            .entry((name.to_owned(), prefix.to_owned()))
            .or_default()
            .clone();
        Ok(MemoryStore {
            name: name.to_owned(),
            entries,
        })
    }
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    name: String,
    entries: Entries,
}

impl Collection for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let lock = self
            .entries
            .read()
            .map_err(|e| Error::Get(format!("Can not lock data: {}", e)))?;
        lock.get(key)
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(key.to_owned()))
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<(), Error> {
        let mut lock = self
            .entries
            .write()
            .map_err(|e| Error::Store(format!("Can not lock data: {}", e)))?;
        lock.insert(key.to_owned(), data.to_vec());
        Ok(())
    }

    fn del(&self, key: &str) -> Result<(), Error> {
        let mut lock = self
            .entries
            .write()
            .map_err(|e| Error::Store(format!("Can not lock data: {}", e)))?;
        match lock.remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::EntryNotFound(key.to_owned())),
        }
    }

    fn purge(&self) -> Result<(), Error> {
        let mut lock = self
            .entries
            .write()
            .map_err(|e| Error::Store(format!("Can not lock data: {}", e)))?;
        lock.clear();
        Ok(())
    }

    fn iter<'a>(
        &'a self,
        reverse: bool,
    ) -> Box<dyn Iterator<Item = (String, Vec<u8>)> + 'a> {
        let Ok(lock) = self.entries.read() else {
            return Box::new(std::iter::empty());
        };
        // Snapshot, so the lock is not held across the caller's iteration.
        let items: Vec<(String, Vec<u8>)> = if reverse {
            lock.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect()
        } else {
            lock.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        Box::new(items.into_iter())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, Error> {
        let lock = self
            .entries
            .read()
            .map_err(|e| Error::Get(format!("Can not lock data: {}", e)))?;
        Ok(lock
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_store_trait;

    test_store_trait! {
        unit_test_memory_manager:crate::memory::MemoryManager:MemoryStore
    }
}
