//! Snapshot cache keyed by sheet name.
//!
//! Entries are created on first read, replaced wholesale on re-fetch and
//! dropped by [`SnapshotCache::invalidate`]. Each insert gets a fresh
//! generation number, so a position taken from an older snapshot can always
//! be told apart from one taken from the current snapshot.

use crate::sheet::{SheetData, Snapshot};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: HashMap<String, Arc<Snapshot>>,
    next_generation: u64,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Snapshot>> {
        self.entries.get(key).cloned()
    }

    /// Store freshly fetched data under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: &str, data: SheetData) -> Arc<Snapshot> {
        self.next_generation += 1;
        let snapshot = Arc::new(Snapshot::new(key, self.next_generation, data));
        self.entries.insert(key.to_string(), Arc::clone(&snapshot));
        log::debug!(
            "Cached '{}' generation {} ({} rows)",
            key,
            snapshot.generation,
            snapshot.len()
        );
        snapshot
    }

    /// Drop the entry for `key`. Returns whether an entry existed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        if existed {
            log::debug!("Invalidated '{}'", key);
        }
        existed
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Generation of the cached snapshot, if any.
    pub fn generation(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|s| s.generation)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_increasing_generations() {
        let mut cache = SnapshotCache::new();
        let first = cache.insert("A", SheetData::default());
        let second = cache.insert("A", SheetData::default());
        assert!(second.generation > first.generation);
        assert_eq!(cache.generation("A"), Some(second.generation));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = SnapshotCache::new();
        cache.insert("A", SheetData::default());
        cache.insert("B", SheetData::default());
        assert!(cache.invalidate("A"));
        assert!(!cache.invalidate("A"));
        assert!(cache.get("A").is_none());
        assert!(cache.contains("B"));
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_generation_survives_invalidation() {
        let mut cache = SnapshotCache::new();
        let old = cache.insert("A", SheetData::default()).generation;
        cache.invalidate("A");
        let new = cache.insert("A", SheetData::default()).generation;
        assert_ne!(old, new);
    }
}
