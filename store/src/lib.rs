// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Store module.
//!
//! Backend-agnostic key/value collections and the typed repositories built on them.
//!

pub mod database;
pub mod error;
pub mod memory;
pub mod repository;

pub use error::Error;
pub use repository::{Record, Repository};
