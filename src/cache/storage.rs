//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::traits::Tag;

/// A single cached read.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// The cached value, serialized
  pub value: Value,
  /// Entity type the value was stored as
  pub entity_type: &'static str,
  /// Tags the read provides
  pub tags: Vec<Tag>,
  /// When the entry was stored
  pub cached_at: DateTime<Utc>,
  /// Set once one of the entry's tags is invalidated
  pub stale: bool,
}

impl CachedEntry {
  pub fn is_invalidated_by(&self, invalidated: &[Tag]) -> bool {
    self
      .tags
      .iter()
      .any(|tag| invalidated.iter().any(|inv| tag.is_invalidated_by(inv)))
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under a key.
  fn get(&self, key: &str) -> Option<CachedEntry>;

  /// Store an entry, replacing any previous one.
  fn store(&self, key: &str, entry: CachedEntry);

  /// Mark every entry carrying one of the tags as stale.
  /// Returns the keys that were marked.
  fn invalidate(&self, tags: &[Tag]) -> Vec<String>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Option<CachedEntry> {
    None // Always miss
  }

  fn store(&self, _key: &str, _entry: CachedEntry) {}

  fn invalidate(&self, _tags: &[Tag]) -> Vec<String> {
    Vec::new()
  }
}

/// In-memory storage. Entries live until the process exits; stale entries
/// are kept and replaced by the next successful read.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CachedEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Option<CachedEntry> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.get(key).cloned()
  }

  fn store(&self, key: &str, entry: CachedEntry) {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.insert(key.to_string(), entry);
  }

  fn invalidate(&self, tags: &[Tag]) -> Vec<String> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries
      .iter_mut()
      .filter(|(_, entry)| entry.is_invalidated_by(tags))
      .map(|(key, entry)| {
        entry.stale = true;
        key.clone()
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn entry(tags: Vec<Tag>) -> CachedEntry {
    CachedEntry {
      value: json!([]),
      entity_type: "book",
      tags,
      cached_at: Utc::now(),
      stale: false,
    }
  }

  #[test]
  fn test_store_and_get() {
    let storage = MemoryStorage::new();
    storage.store("a", entry(vec![Tag::collection("Books")]));
    assert!(storage.get("a").is_some());
    assert!(storage.get("b").is_none());
  }

  #[test]
  fn test_invalidate_marks_matching_entries() {
    let storage = MemoryStorage::new();
    storage.store("list", entry(vec![Tag::collection("Books")]));
    storage.store("one", entry(vec![Tag::member("Books", "1")]));
    storage.store("summary", entry(vec![Tag::collection("Borrows")]));

    let mut keys = storage.invalidate(&[Tag::collection("Books")]);
    keys.sort();
    assert_eq!(keys, vec!["list".to_string(), "one".to_string()]);
    assert!(storage.get("list").unwrap().stale);
    assert!(storage.get("one").unwrap().stale);
    assert!(!storage.get("summary").unwrap().stale);
  }

  #[test]
  fn test_noop_storage_never_hits() {
    let storage = NoopStorage;
    storage.store("a", entry(vec![]));
    assert!(storage.get("a").is_none());
    assert!(storage.invalidate(&[Tag::collection("Books")]).is_empty());
  }
}
