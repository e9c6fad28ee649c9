//! Address-bar suggestion index.
//!
//! Expanding a tree root registers one entry per resource of the root object,
//! keyed `namespace\relativePath.type`, so the resource can later be opened
//! directly with the same property values.

use dashmap::DashMap;
use serde::Serialize;

use crate::model::ObjectContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionEntry {
    /// `namespace\relativePath.type`
    pub path: String,
    pub namespace: String,
    pub object_path: String,
    pub context: ObjectContext,
}

/// Persistent store behind the suggestion index.
pub trait SuggestionStore: Send + Sync {
    /// Add `entry` unless an identical one (same path and context) exists.
    ///
    /// Returns whether the entry was added.
    fn put_suggestion_if_not_exists(&self, entry: SuggestionEntry) -> bool;

    /// Remove every entry for `path`, returning how many were removed.
    fn remove_suggestions_by_path(&self, path: &str) -> usize;

    /// Remove everything.
    fn destroy(&self);
}

/// Suggestion store held in memory.
#[derive(Debug, Default)]
pub struct InMemorySuggestionStore {
    entries: DashMap<String, Vec<SuggestionEntry>>,
}

impl InMemorySuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Vec<SuggestionEntry> {
        self.entries.get(path).map(|entries| entries.value().clone()).unwrap_or_default()
    }

    /// Total number of entries across all paths.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|entries| entries.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SuggestionStore for InMemorySuggestionStore {
    fn put_suggestion_if_not_exists(&self, entry: SuggestionEntry) -> bool {
        let mut entries = self.entries.entry(entry.path.clone()).or_default();
        if entries.iter().any(|existing| existing.context == entry.context) {
            false
        } else {
            entries.push(entry);
            true
        }
    }

    fn remove_suggestions_by_path(&self, path: &str) -> usize {
        self.entries.remove(path).map(|(_, entries)| entries.len()).unwrap_or(0)
    }

    fn destroy(&self) {
        self.entries.clear();
    }
}
