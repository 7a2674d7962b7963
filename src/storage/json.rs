//! JSON file store
//!
//! The whole mapping lives in one UTF-8 JSON object, indented with four
//! spaces, with non-ASCII text written as-is. Every merge reads the file,
//! applies the record and writes a new file next to it, which then replaces
//! the old one. A failed write leaves the previous file intact.

use crate::record::PostRecord;
use crate::storage::traits::{MergeOutcome, Storage, StorageError, StorageResult};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;

/// Store persisted as a JSON object on disk
pub struct JsonStore {
    path: PathBuf,
    gate: Mutex<()>,
}

impl JsonStore {
    /// Creates a store at `path`; the file is created by the first merge
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted mapping; a missing or empty file is an empty mapping
    fn read_entries(&self) -> StorageResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content)? {
            Value::Object(entries) => Ok(entries),
            other => Err(StorageError::Corrupt(format!(
                "{} holds {} instead of an object",
                self.path.display(),
                json_kind(&other)
            ))),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let staged = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(staged.as_file());
            let mut serializer = serde_json::Serializer::with_formatter(
                &mut writer,
                PrettyFormatter::with_indent(b"    "),
            );
            entries.serialize(&mut serializer)?;
            writer.flush()?;
        }
        staged.as_file().sync_all()?;

        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Storage for JsonStore {
    fn merge(&self, record: &PostRecord) -> StorageResult<MergeOutcome> {
        // A panicked writer cannot leave a half-applied state behind the
        // gate: the file is the state, so a poisoned lock is still usable.
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.read_entries()?;
        let mut outcome = MergeOutcome::default();

        for (key, value) in record.iter() {
            match entries.insert(key.to_string(), Value::String(value.to_string())) {
                Some(_) => outcome.overwritten += 1,
                None => outcome.inserted += 1,
            }
        }
        outcome.total = entries.len();

        self.write_entries(&entries)?;
        Ok(outcome)
    }

    fn load(&self) -> StorageResult<Vec<(String, String)>> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = self.read_entries()?;
        Ok(entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(text) => (key, text),
                other => (key, other.to_string()),
            })
            .collect())
    }

    fn len(&self) -> StorageResult<usize> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_entries()?.len())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(entries: &[(&str, &str)]) -> PostRecord {
        entries.iter().copied().collect()
    }

    fn store_in(dir: &TempDir) -> JsonStore {
        JsonStore::new(&dir.path().join("posts.json"))
    }

    #[test]
    fn test_first_merge_creates_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let outcome = store
            .merge(&record(&[("2024-03-01 09:30", "body"), ("03-01 09:45", "comment")]))
            .unwrap();

        assert_eq!(
            outcome,
            MergeOutcome {
                inserted: 2,
                overwritten: 0,
                total: 2
            }
        );
        assert!(store.path().exists());
    }

    #[test]
    fn test_disjoint_merge_grows_by_record_size() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.merge(&record(&[("a", "1"), ("b", "2")])).unwrap();

        let before = store.len().unwrap();
        let addition = record(&[("c", "3"), ("d", "4"), ("e", "5")]);
        store.merge(&addition).unwrap();

        assert_eq!(store.len().unwrap(), before + addition.len());
    }

    #[test]
    fn test_colliding_key_overwrites_without_growing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.merge(&record(&[("Unknown", "first post"), ("b", "2")])).unwrap();

        let outcome = store.merge(&record(&[("Unknown", "second post")])).unwrap();

        assert_eq!(outcome.inserted, 0);
        assert_eq!(outcome.overwritten, 1);
        assert_eq!(store.len().unwrap(), 2);
        let entries = store.load().unwrap();
        assert_eq!(entries[0], ("Unknown".to_string(), "second post".to_string()));
    }

    #[test]
    fn test_disjoint_merges_are_order_independent() {
        let dir = TempDir::new().unwrap();
        let a = record(&[("a1", "x"), ("a2", "y")]);
        let b = record(&[("b1", "z")]);
        let c = record(&[("c1", "w"), ("c2", "v")]);

        let first = JsonStore::new(&dir.path().join("first.json"));
        first.merge(&a).unwrap();
        first.merge(&b).unwrap();
        first.merge(&c).unwrap();

        let second = JsonStore::new(&dir.path().join("second.json"));
        second.merge(&c).unwrap();
        second.merge(&a).unwrap();
        second.merge(&b).unwrap();

        let mut left = first.load().unwrap();
        let mut right = second.load().unwrap();
        left.sort();
        right.sort();
        assert_eq!(left, right);
    }

    #[test]
    fn test_empty_file_is_treated_as_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "").unwrap();

        store.merge(&record(&[("k", "v")])).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_output_is_indented_and_unescaped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .merge(&record(&[("2024-03-01 09:30", "上证指数今天涨了")]))
            .unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "{\n    \"2024-03-01 09:30\": \"上证指数今天涨了\"\n}"
        );
    }

    #[test]
    fn test_corrupt_file_is_left_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();

        let result = store.merge(&record(&[("k", "v")]));

        assert!(matches!(result, Err(StorageError::Json(_))));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_replaces_file_instead_of_truncating() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.merge(&record(&[("a", "1"), ("b", "2")])).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        // A reader holding the old file keeps seeing complete data
        let mut held = fs::File::open(store.path()).unwrap();
        store.merge(&record(&[("c", "3")])).unwrap();

        let mut seen = String::new();
        std::io::Read::read_to_string(&mut held, &mut seen).unwrap();
        assert_eq!(seen, before);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_rewrite_leaves_no_staging_files() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for i in 0..5 {
            let key = format!("k{}", i);
            store.merge(&record(&[(key.as_str(), "v")])).unwrap();
        }

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(store.len().unwrap(), 5);
    }

    #[test]
    fn test_non_object_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "[1, 2]").unwrap();

        assert!(matches!(
            store.merge(&record(&[("k", "v")])),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_unwritable_location_reports_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(&dir.path().join("missing").join("posts.json"));
        assert!(matches!(
            store.merge(&record(&[("k", "v")])),
            Err(StorageError::Io(_))
        ));
    }

    #[test]
    fn test_concurrent_merges_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let key = format!("t{}-{}", t, i);
                        store.merge(&record(&[(key.as_str(), "text")])).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len().unwrap(), 80);
    }
}
