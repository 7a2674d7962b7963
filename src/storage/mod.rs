//! Storage module for persisting harvested records
//!
//! The store is a single keyed collection (timestamp label -> text) that grows
//! across runs. Each merge is a read-modify-write cycle performed under one
//! mutex, so concurrent workers never lose each other's updates. A failed
//! merge is reported to the caller and leaves earlier data as it was.
//!
//! Two backends exist:
//! - `JsonStore`: a pretty-printed UTF-8 JSON object, rewritten on every merge
//! - `SqliteStore`: an upserted `entries` table

mod json;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonStore;
pub use sqlite::SqliteStore;
pub use traits::{MergeOutcome, Storage, StorageError, StorageResult};

use crate::config::{OutputConfig, StoreFormat};
use std::path::Path;
use std::sync::Arc;

/// Opens the store selected by the output configuration
///
/// The JSON store touches nothing until its first merge; the SQLite store
/// creates its file and schema immediately.
pub fn open_store(config: &OutputConfig) -> StorageResult<Arc<dyn Storage>> {
    let path = Path::new(&config.store_path);
    let store: Arc<dyn Storage> = match config.format {
        StoreFormat::Json => Arc::new(JsonStore::new(path)),
        StoreFormat::Sqlite => Arc::new(SqliteStore::new(path)?),
    };
    Ok(store)
}
