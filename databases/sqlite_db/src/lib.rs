// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # SQLite database module.
//!
//! Durable backend for the store collections.
//!

mod sqlite;

pub use sqlite::{SqliteCollection, SqliteManager};
