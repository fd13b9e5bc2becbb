// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # SQLite database backend.
//!
//! Every collection is a table `(prefix, sn, value)` keyed by `(prefix, sn)`, where `sn` holds
//! the collection key. Collections with the same table and prefix share rows.
//!

use store::{
    Error,
    database::{Collection, DbManager},
};

use rusqlite::{Connection, OpenFlags, Result as SQLiteResult, params};
use tracing::{error, info};

use std::sync::{Arc, Mutex, MutexGuard};
use std::{fs, path::Path};

/// SQLite database manager.
///
/// Owns one connection shared by every collection it creates. The database file is
/// `database.db` inside the directory given to [`SqliteManager::new`].
#[derive(Clone)]
pub struct SqliteManager {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteManager {
    /// Opens or creates the database in the directory `path`.
    ///
    /// # Errors
    ///
    /// Returns Error::CreateStore if the directory cannot be created or the connection
    /// cannot be opened.
    ///
    pub fn new(path: &str) -> Result<Self, Error> {
        info!("Creating SQLite database manager");
        if !Path::new(&path).exists() {
            info!("Path does not exist, creating it");
            fs::create_dir_all(path).map_err(|e| {
                Error::CreateStore(format!(
                    "fail SQLite create directory: {}",
                    e
                ))
            })?;
        }

        info!("Opening SQLite connection");
        let conn = open(format!("{}/database.db", path)).map_err(|e| {
            Error::CreateStore(format!("fail SQLite open connection: {}", e))
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Table names are interpolated into SQL, so only `[A-Za-z0-9_]` is accepted and the first
/// character must not be a digit.
fn check_identifier(identifier: &str) -> Result<(), Error> {
    let valid = !identifier.is_empty()
        && identifier.len() <= 64
        && !identifier.starts_with(|c: char| c.is_ascii_digit())
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        error!("Rejected SQLite table name '{}'", identifier);
        Err(Error::CreateStore(format!(
            "invalid table name: '{}'",
            identifier
        )))
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, Error> {
    conn.lock()
        .map_err(|e| Error::Store(format!("sqlite open connection: {}", e)))
}

impl DbManager<SqliteCollection> for SqliteManager {
    fn create_collection(
        &self,
        identifier: &str,
        prefix: &str,
    ) -> Result<SqliteCollection, Error> {
        check_identifier(identifier)?;
        let stmt = format!(
            "CREATE TABLE IF NOT EXISTS {} (prefix TEXT NOT NULL, sn TEXT NOT NULL, value \
            BLOB NOT NULL, PRIMARY KEY (prefix, sn))",
            identifier
        );

        {
            let conn = lock(&self.conn)?;
            conn.execute(stmt.as_str(), ()).map_err(|e| {
                Error::CreateStore(format!("fail SQLite create table: {}", e))
            })?;
        }

        Ok(SqliteCollection::new(self.conn.clone(), identifier, prefix))
    }

    fn stop(self) -> Result<(), Error> {
        let conn = lock(&self.conn)?;
        // Fold the WAL back into the main file.
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(|e| Error::Store(format!("SQLite checkpoint: {}", e)))
    }
}

/// SQLite collection: the rows of one table under one prefix.
pub struct SqliteCollection {
    conn: Arc<Mutex<Connection>>,
    table: String,
    prefix: String,
}

impl SqliteCollection {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        table: &str,
        prefix: &str,
    ) -> Self {
        Self {
            conn,
            table: table.to_owned(),
            prefix: prefix.to_owned(),
        }
    }

    /// Rows under the collection prefix, ordered by key.
    fn make_iter(&self, reverse: bool) -> SQLiteResult<Vec<(String, Vec<u8>)>> {
        let order = if reverse { "DESC" } else { "ASC" };
        let Ok(conn) = self.conn.lock() else {
            return Ok(Vec::new());
        };
        let query = format!(
            "SELECT sn, value FROM {} WHERE prefix = ?1 ORDER BY sn {}",
            self.table, order,
        );
        let mut stmt = conn.prepare(&query)?;
        let mut rows = stmt.query(params![self.prefix])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push((row.get(0)?, row.get(1)?));
        }
        Ok(values)
    }
}

impl Collection for SqliteCollection {
    fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let conn = lock(&self.conn)?;
        let query = format!(
            "SELECT value FROM {} WHERE prefix = ?1 AND sn = ?2",
            &self.table
        );
        conn.query_row(&query, params![self.prefix, key], |row| row.get(0))
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    Error::EntryNotFound(key.to_owned())
                }
                e => Error::Get(format!("sqlite select error: {}", e)),
            })
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<(), Error> {
        let conn = lock(&self.conn)?;
        let stmt = format!(
            "INSERT OR REPLACE INTO {} (prefix, sn, value) VALUES (?1, ?2, ?3)",
            &self.table
        );
        conn.execute(&stmt, params![self.prefix, key, data])
            .map_err(|e| Error::Store(format!("sqlite insert error: {}", e)))?;
        Ok(())
    }

    fn del(&self, key: &str) -> Result<(), Error> {
        let conn = lock(&self.conn)?;
        let stmt = format!(
            "DELETE FROM {} WHERE prefix = ?1 AND sn = ?2",
            &self.table
        );
        let deleted = conn
            .execute(&stmt, params![self.prefix, key])
            .map_err(|e| Error::Store(format!("sqlite delete error: {}", e)))?;
        if deleted == 0 {
            return Err(Error::EntryNotFound(key.to_owned()));
        }
        Ok(())
    }

    fn purge(&self) -> Result<(), Error> {
        let conn = lock(&self.conn)?;
        let stmt = format!("DELETE FROM {} WHERE prefix = ?1", &self.table);
        conn.execute(&stmt, params![self.prefix])
            .map_err(|e| Error::Store(format!("SQLITE purge error: {}", e)))?;
        Ok(())
    }

    fn iter<'a>(
        &'a self,
        reverse: bool,
    ) -> Box<dyn Iterator<Item = (String, Vec<u8>)> + 'a> {
        match self.make_iter(reverse) {
            Ok(values) => Box::new(values.into_iter()),
            Err(e) => {
                error!("SQLite iteration over {} failed: {}", self.table, e);
                Box::new(std::iter::empty())
            }
        }
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, Error> {
        let conn = lock(&self.conn)?;
        let query = format!(
            "SELECT sn, value FROM {} WHERE prefix = ?1 \
            AND substr(sn, 1, length(?2)) = ?2 ORDER BY sn ASC",
            self.table
        );
        let map_err =
            |e: rusqlite::Error| Error::Get(format!("sqlite scan error: {}", e));
        let mut stmt = conn.prepare(&query).map_err(map_err)?;
        let mut rows = stmt.query(params![self.prefix, prefix]).map_err(map_err)?;
        let mut values = Vec::new();
        while let Some(row) = rows.next().map_err(map_err)? {
            values.push((
                row.get(0).map_err(map_err)?,
                row.get(1).map_err(map_err)?,
            ));
        }
        Ok(values)
    }

    fn name(&self) -> &str {
        self.table.as_str()
    }
}

/// Open a SQLite database connection in WAL mode.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection, Error> {
    let path = path.as_ref();
    let flags =
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    let conn = Connection::open_with_flags(path, flags).map_err(|e| {
        Error::Store(format!("SQLite failed to open connection: {}", e))
    })?;

    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        ",
    )
    .map_err(|e| {
        Error::Store(format!("SQLite failed to execute batch: {}", e))
    })?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::test_store_trait;

    impl Default for SqliteManager {
        fn default() -> Self {
            // The directory outlives the test; the OS cleans the temp dir.
            let dir = tempfile::tempdir()
                .expect("Can not create temporal directory.")
                .into_path();
            SqliteManager::new(dir.to_str().unwrap())
                .expect("Cannot open the database")
        }
    }

    test_store_trait! {
        unit_test_sqlite_manager:SqliteManager:SqliteCollection
    }

    #[test]
    fn test_identifiers() {
        assert!(check_identifier("posts_unique").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("1posts").is_err());
        assert!(check_identifier("posts; DROP TABLE users").is_err());
        assert!(check_identifier("posts-unique").is_err());
    }
}
