//! The record produced from one post page
//!
//! A `PostRecord` is an ordered mapping from a displayed timestamp (or a
//! placeholder label) to text. The first entry is the post body, the rest are
//! comments. Inserting an existing key replaces its value in place.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered timestamp-to-text mapping extracted from a single post page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    entries: Vec<(String, String)>,
}

impl PostRecord {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, overwriting the value of an existing key
    ///
    /// Returns the previous value when the key was already present. The
    /// overwritten entry keeps the position of its first insertion.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Looks up the value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The first entry, which is the post body
    pub fn body(&self) -> Option<(&str, &str)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PostRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = PostRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for PostRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
