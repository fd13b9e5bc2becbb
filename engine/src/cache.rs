// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Entity cache
//!
//! An [`EntityStore`] is the in-memory view one actor keeps of one entity kind. The repository
//! stays the source of truth: reads go through to it on a miss, and every mutation is persisted
//! before the cached copy is replaced, so a failed write leaves the cache as it was.
//!

use crate::error::Error;

use store::{Record, Repository};
use tracing::{debug, error};

use std::collections::HashMap;

pub struct EntityStore<T: Record> {
    repository: Repository<T>,
    cache: HashMap<String, T>,
}

impl<T: Record> EntityStore<T> {
    pub fn new(repository: Repository<T>) -> Self {
        Self {
            repository,
            cache: HashMap::new(),
        }
    }

    pub fn repository(&self) -> &Repository<T> {
        &self.repository
    }

    /// Cached entity, reading through to the repository on a miss.
    pub fn get(&mut self, key: &str) -> Result<T, Error> {
        if let Some(entity) = self.cache.get(key) {
            return Ok(entity.clone());
        }
        debug!("Cache miss on {} {}.", self.repository.name(), key);
        let entity = self.repository.get(key)?;
        self.cache.insert(key.to_owned(), entity.clone());
        Ok(entity)
    }

    /// Drops the cached copy and reads the repository again.
    pub fn refresh(&mut self, key: &str) -> Result<T, Error> {
        self.cache.remove(key);
        self.get(key)
    }

    pub fn get_by_unique(&mut self, index: &str, value: &str) -> Result<T, Error> {
        let entity = self.repository.get_by_unique(index, value)?;
        let key = entity.key();
        // A resident copy may be newer than what the index just returned.
        match self.cache.get(&key) {
            Some(cached) => Ok(cached.clone()),
            None => {
                self.cache.insert(key, entity.clone());
                Ok(entity)
            }
        }
    }

    /// Persists a new entity, then caches it.
    pub fn create(&mut self, entity: T) -> Result<T, Error> {
        self.repository.create(&entity).map_err(|e| {
            if !matches!(e, store::Error::Duplicate(_)) {
                error!("Can't create {} {}: {}", self.repository.name(), entity.key(), e);
            }
            Error::from(e)
        })?;
        self.cache.insert(entity.key(), entity.clone());
        Ok(entity)
    }

    /// Persists `entity` as is, then caches it.
    pub fn save(&mut self, entity: T) -> Result<T, Error> {
        self.repository.upsert(&entity).map_err(|e| {
            error!("Can't save {} {}: {}", self.repository.name(), entity.key(), e);
            Error::from(e)
        })?;
        self.cache.insert(entity.key(), entity.clone());
        Ok(entity)
    }

    /// Applies `change` to a copy of the entity and persists it. If `change` or the write
    /// fails the cached entity is untouched.
    pub fn modify<R, F>(&mut self, key: &str, change: F) -> Result<(T, R), Error>
    where
        F: FnOnce(&mut T) -> Result<R, Error>,
    {
        let mut entity = self.get(key)?;
        let outcome = change(&mut entity)?;
        let entity = self.save(entity)?;
        Ok((entity, outcome))
    }

    /// Deletes the entity from the repository, then from the cache.
    pub fn remove(&mut self, key: &str) -> Result<T, Error> {
        let entity = self.repository.remove(key).map_err(|e| {
            error!("Can't remove {} {}: {}", self.repository.name(), key, e);
            Error::from(e)
        })?;
        self.cache.remove(key);
        Ok(entity)
    }

    /// Entities related to `value`, read from the repository.
    pub fn list_by(&mut self, relation: &str, value: &str) -> Result<Vec<T>, Error> {
        let entities = self.repository.list_by(relation, value)?;
        Ok(self.prefer_cached(entities))
    }

    pub fn all(&mut self) -> Result<Vec<T>, Error> {
        let entities = self.repository.all()?;
        Ok(self.prefer_cached(entities))
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    fn prefer_cached(&mut self, entities: Vec<T>) -> Vec<T> {
        entities
            .into_iter()
            .map(|entity| {
                self.cache
                    .entry(entity.key())
                    .or_insert(entity)
                    .clone()
            })
            .collect()
    }
}
