// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Store errors
//!
//! `EntryNotFound` is an expected outcome of a lookup and callers usually branch on it.
//! `Duplicate` is raised by repositories when a primary or unique key is already taken. The
//! remaining variants are backend failures.
//!

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store error.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq)]
pub enum Error {
    /// The backend could not be opened or a collection could not be created.
    #[error("Can't create store: {0}")]
    CreateStore(String),
    /// A read failed for a reason other than a missing key.
    #[error("Get error: {0}")]
    Get(String),
    /// No entry under the requested key.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),
    /// A primary or unique key is already taken.
    #[error("Duplicate entry: {0}")]
    Duplicate(String),
    /// A write failed.
    #[error("Store error: {0}")]
    Store(String),
    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialize(String),
}
