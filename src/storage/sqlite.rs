//! SQLite storage implementation
//!
//! Entries live in a single `entries` table keyed by timestamp label.
//! Overwriting a key keeps its row id, so load order stays the order in
//! which keys were first seen.

use crate::record::PostRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{MergeOutcome, Storage, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn count(conn: &Connection) -> StorageResult<usize> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl Storage for SqliteStore {
    fn merge(&self, record: &PostRecord) -> StorageResult<MergeOutcome> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut outcome = MergeOutcome::default();

        {
            let mut exists =
                tx.prepare_cached("SELECT EXISTS(SELECT 1 FROM entries WHERE key = ?1)")?;
            let mut upsert = tx.prepare_cached(
                "INSERT INTO entries (key, value, first_seen, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
            )?;

            for (key, value) in record.iter() {
                let present: bool = exists.query_row(params![key], |row| row.get(0))?;
                upsert.execute(params![key, value, now])?;
                if present {
                    outcome.overwritten += 1;
                } else {
                    outcome.inserted += 1;
                }
            }
        }

        outcome.total = Self::count(&tx)?;
        tx.commit()?;
        Ok(outcome)
    }

    fn load(&self) -> StorageResult<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT key, value FROM entries ORDER BY id")?;
        let entries = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn len(&self) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Self::count(&conn)
    }
}
