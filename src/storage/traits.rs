//! Storage traits and error types

use crate::record::PostRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store is corrupt: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What a single merge did to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Keys that were not in the store before
    pub inserted: usize,

    /// Keys whose value was replaced
    pub overwritten: usize,

    /// Key count of the store after the merge
    pub total: usize,
}

/// Trait for store backends
///
/// Implementations serialize `merge` internally: concurrent callers block
/// until the previous read-modify-write cycle has finished.
pub trait Storage: Send + Sync {
    /// Union-merges `record` into the persisted mapping
    ///
    /// Entries of `record` overwrite existing entries with the same key.
    /// On error nothing of `record` is guaranteed to be persisted, but data
    /// persisted by earlier merges is left as it was.
    fn merge(&self, record: &PostRecord) -> StorageResult<MergeOutcome>;

    /// Loads every entry in first-insertion order
    fn load(&self) -> StorageResult<Vec<(String, String)>>;

    /// Number of keys currently persisted
    fn len(&self) -> StorageResult<usize>;

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
