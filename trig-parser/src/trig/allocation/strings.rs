//! `key=value` string tables
//!
//! Rows keep insertion order. Writing an existing key replaces its value in place (last
//! write wins) and logs a warning.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTable {
    rows: IndexMap<String, String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(previous) = self.rows.get(&key) {
            tracing::warn!(%key, %previous, %value, "string table key written twice, keeping the last value");
        }
        self.rows.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.rows.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append every row of `other`, in its order.
    pub fn extend(&mut self, other: &StringTable) {
        for (key, value) in other.iter() {
            self.put(key, value);
        }
    }

    /// One `key=value` row per line, joined with `\n`. Values are written verbatim.
    pub fn render(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Read rows back, splitting each line at its first `=`.
    pub fn parse(text: &str) -> Self {
        let mut table = StringTable::new();
        for line in text.split(['\r', '\n']).filter(|line| !line.is_empty()) {
            match line.split_once('=') {
                Some((key, value)) if !key.is_empty() => table.put(key, value),
                _ => tracing::warn!(%line, "skipping string table line without a key"),
            }
        }
        table
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = StringTable::new();
        for (key, value) in iter {
            table.put(key, value);
        }
        table
    }
}
