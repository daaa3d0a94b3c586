//! In-process record cache.
//!
//! The backing service has no update primitive and no listing of sources
//! with metadata, so the adapter mirrors every successfully inserted record
//! here and answers filter, scroll, count, and existence checks from this
//! map alone. The cache is not persisted; after a process restart it is
//! empty regardless of what the external store holds.
//!
//! Uses `HashMap` behind `std::sync::RwLock` for thread safety. Mutations
//! happen only within the single logical flow of each adapter operation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::Record;

/// Cache of record metadata, keyed by collection then record id.
///
/// Owned by the backend but constructed separately so callers can inject
/// a pre-populated or shared instance.
#[derive(Debug, Default)]
pub struct RecordCache {
    collections: RwLock<HashMap<String, HashMap<String, Record>>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record under its collection, replacing any previous entry
    /// with the same id.
    pub fn insert(&self, collection: &str, record: Record) {
        let mut map = self.collections.write().unwrap();
        map.entry(collection.to_string())
            .or_default()
            .insert(record.id.clone(), record);
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Record> {
        let map = self.collections.read().unwrap();
        map.get(collection).and_then(|c| c.get(id)).cloned()
    }

    /// Fetch several records, skipping ids not present.
    pub fn get_many(&self, collection: &str, ids: &[String]) -> Vec<Record> {
        let map = self.collections.read().unwrap();
        let Some(records) = map.get(collection) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| records.get(id).cloned()).collect()
    }

    pub fn remove(&self, collection: &str, id: &str) -> Option<Record> {
        let mut map = self.collections.write().unwrap();
        map.get_mut(collection).and_then(|c| c.remove(id))
    }

    pub fn contains(&self, collection: &str, id: &str) -> bool {
        let map = self.collections.read().unwrap();
        map.get(collection).is_some_and(|c| c.contains_key(id))
    }

    pub fn ids(&self, collection: &str) -> Vec<String> {
        let map = self.collections.read().unwrap();
        map.get(collection)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All records in a collection, in no particular order.
    pub fn records(&self, collection: &str) -> Vec<Record> {
        let map = self.collections.read().unwrap();
        map.get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, collection: &str) -> usize {
        let map = self.collections.read().unwrap();
        map.get(collection).map(HashMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Total records across all collections.
    pub fn total(&self) -> usize {
        let map = self.collections.read().unwrap();
        map.values().map(HashMap::len).sum()
    }

    /// Empty a collection but keep it known to the cache.
    pub fn reset_collection(&self, collection: &str) {
        let mut map = self.collections.write().unwrap();
        map.insert(collection.to_string(), HashMap::new());
    }

    /// Forget a collection entirely.
    pub fn drop_collection(&self, collection: &str) {
        let mut map = self.collections.write().unwrap();
        map.remove(collection);
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut map = self.collections.write().unwrap();
        map.clear();
    }
}
