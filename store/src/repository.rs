// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Typed repositories
//!
//! A [`Repository`] stores one record type over three collections of the same backend:
//!
//! - `<name>`: `key → bincode(record)`
//! - `<name>_unique`: `"<index>:<value>" → key`, one entry per unique secondary key
//! - `<name>_relations`: `"<relation>:<value>:<key>" → ()`, scanned by prefix for `list_by`
//!
//! Writes are not transactional across the three collections. The record is written first, so
//! a crash can leave a dangling index entry but never an indexed key without its record; both
//! lookups tolerate the former.

use crate::{
    database::{Collection, DbManager},
    error::Error,
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error};

use std::{collections::HashSet, marker::PhantomData, sync::Arc};

/// A value a repository can store.
pub trait Record:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Primary key.
    fn key(&self) -> String;

    /// Unique secondary keys, as `(index, value)`.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Relations this record can be listed by, as `(relation, value)`.
    fn relations(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Durable storage for one record type.
pub struct Repository<T> {
    name: String,
    records: Arc<dyn Collection>,
    uniques: Arc<dyn Collection>,
    relations: Arc<dyn Collection>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            records: self.records.clone(),
            uniques: self.uniques.clone(),
            relations: self.relations.clone(),
            _record: PhantomData,
        }
    }
}

fn unique_entry(index: &str, value: &str) -> String {
    format!("{}:{}", index, value)
}

fn relation_entry(relation: &str, value: &str, key: &str) -> String {
    format!("{}:{}:{}", relation, value, key)
}

impl<T: Record> Repository<T> {
    /// Opens the collections backing the repository `name`.
    pub fn new<C, M>(manager: &M, name: &str) -> Result<Self, Error>
    where
        C: Collection + 'static,
        M: DbManager<C>,
    {
        let records = manager.create_collection(name, "records")?;
        let uniques =
            manager.create_collection(&format!("{}_unique", name), "unique")?;
        let relations = manager
            .create_collection(&format!("{}_relations", name), "relations")?;
        Ok(Self {
            name: name.to_owned(),
            records: Arc::new(records),
            uniques: Arc::new(uniques),
            relations: Arc::new(relations),
            _record: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a new record. `Duplicate` if the key or any unique key is taken.
    pub fn create(&self, record: &T) -> Result<(), Error> {
        let key = record.key();
        match self.records.get(&key) {
            Ok(_) => {
                return Err(Error::Duplicate(format!(
                    "{} {} already exists",
                    self.name, key
                )));
            }
            Err(Error::EntryNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.check_unique(record, &key)?;
        self.write(record, None)
    }

    /// Inserts or replaces a record, keeping indexes in line with it.
    pub fn upsert(&self, record: &T) -> Result<(), Error> {
        let key = record.key();
        self.check_unique(record, &key)?;
        let previous = match self.get(&key) {
            Ok(previous) => Some(previous),
            Err(Error::EntryNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        self.write(record, previous.as_ref())
    }

    /// Read-modify-write of one record. Nothing is written if `change` fails.
    pub fn update<F>(&self, key: &str, change: F) -> Result<T, Error>
    where
        F: FnOnce(&mut T) -> Result<(), Error>,
    {
        let mut record = self.get(key)?;
        let previous = record.clone();
        change(&mut record)?;
        self.write(&record, Some(&previous))?;
        Ok(record)
    }

    /// Deletes a record and its index entries. Returns what was stored.
    pub fn remove(&self, key: &str) -> Result<T, Error> {
        let record = self.get(key)?;
        self.records.del(key)?;
        for (index, value) in record.unique_keys() {
            self.forget(&*self.uniques, &unique_entry(index, &value))?;
        }
        for (relation, value) in record.relations() {
            self.forget(&*self.relations, &relation_entry(relation, &value, key))?;
        }
        Ok(record)
    }

    pub fn get(&self, key: &str) -> Result<T, Error> {
        let bytes = self.records.get(key)?;
        self.decode(&bytes)
    }

    pub fn exists(&self, key: &str) -> Result<bool, Error> {
        match self.records.get(key) {
            Ok(_) => Ok(true),
            Err(Error::EntryNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Looks a record up by one of its unique keys.
    pub fn get_by_unique(&self, index: &str, value: &str) -> Result<T, Error> {
        let entry = unique_entry(index, value);
        let key = self.uniques.get(&entry)?;
        let key = String::from_utf8(key)
            .map_err(|e| Error::Serialize(format!("Invalid key: {}", e)))?;
        let record = self.get(&key)?;
        // The index may lag behind a record that changed its unique value.
        if record
            .unique_keys()
            .iter()
            .any(|(i, v)| *i == index && v == value)
        {
            Ok(record)
        } else {
            Err(Error::EntryNotFound(entry))
        }
    }

    /// Every record related to `value` through `relation`, in key order.
    pub fn list_by(&self, relation: &str, value: &str) -> Result<Vec<T>, Error> {
        let prefix = format!("{}:{}:", relation, value);
        let mut result = Vec::new();
        for (entry, _) in self.relations.scan(&prefix)? {
            let key = &entry[prefix.len()..];
            match self.get(key) {
                Ok(record) => result.push(record),
                Err(Error::EntryNotFound(_)) => {
                    debug!("Dangling relation entry {} in {}.", entry, self.name);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }

    /// Every record, in key order.
    pub fn all(&self) -> Result<Vec<T>, Error> {
        self.records
            .iter(false)
            .map(|(_, bytes)| self.decode(&bytes))
            .collect()
    }

    fn check_unique(&self, record: &T, key: &str) -> Result<(), Error> {
        for (index, value) in record.unique_keys() {
            match self.uniques.get(&unique_entry(index, &value)) {
                Ok(owner) if owner != key.as_bytes() => {
                    // The owner may have moved to another value since.
                    let owner = String::from_utf8_lossy(&owner).to_string();
                    let still_owned = match self.get(&owner) {
                        Ok(other) => other
                            .unique_keys()
                            .iter()
                            .any(|(i, v)| *i == index && *v == value),
                        Err(Error::EntryNotFound(_)) => false,
                        Err(e) => return Err(e),
                    };
                    if still_owned {
                        return Err(Error::Duplicate(format!(
                            "{} {} '{}' is taken",
                            self.name, index, value
                        )));
                    }
                }
                Ok(_) | Err(Error::EntryNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn write(&self, record: &T, previous: Option<&T>) -> Result<(), Error> {
        let key = record.key();
        let bytes = bincode::serialize(record).map_err(|e| {
            error!("Can't serialize {} {}: {}", self.name, key, e);
            Error::Serialize(e.to_string())
        })?;
        self.records.put(&key, &bytes)?;

        let uniques: HashSet<(&'static str, String)> =
            record.unique_keys().into_iter().collect();
        let relations: HashSet<(&'static str, String)> =
            record.relations().into_iter().collect();
        if let Some(previous) = previous {
            for (index, value) in previous.unique_keys() {
                if !uniques.contains(&(index, value.clone())) {
                    self.forget(&*self.uniques, &unique_entry(index, &value))?;
                }
            }
            for (relation, value) in previous.relations() {
                if !relations.contains(&(relation, value.clone())) {
                    self.forget(
                        &*self.relations,
                        &relation_entry(relation, &value, &key),
                    )?;
                }
            }
        }
        for (index, value) in &uniques {
            self.uniques.put(&unique_entry(index, value), key.as_bytes())?;
        }
        for (relation, value) in &relations {
            self.relations.put(&relation_entry(relation, value, &key), &[])?;
        }
        Ok(())
    }

    fn forget(&self, collection: &dyn Collection, entry: &str) -> Result<(), Error> {
        match collection.del(entry) {
            Ok(()) | Err(Error::EntryNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, Error> {
        bincode::deserialize(bytes).map_err(|e| {
            error!("Can't deserialize {} record: {}", self.name, e);
            Error::Serialize(e.to_string())
        })
    }
}
