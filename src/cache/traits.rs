//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for values that can be cached.
///
/// Cached values are stored as JSON so entries of different types can share
/// one store and one in-flight table.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Entity type name used to tell entries apart (e.g., "book")
  fn entity_type() -> &'static str;
}

/// A label tying cached reads to invalidation events.
///
/// A tag without an id stands for a whole collection; a tag with an id names
/// one member of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
  pub kind: &'static str,
  pub id: Option<String>,
}

impl Tag {
  pub fn collection(kind: &'static str) -> Self {
    Self { kind, id: None }
  }

  pub fn member(kind: &'static str, id: impl Into<String>) -> Self {
    Self {
      kind,
      id: Some(id.into()),
    }
  }

  /// Whether invalidating `invalidated` affects a read carrying this tag.
  ///
  /// A collection-wide invalidation reaches every tag of that kind; an
  /// id-specific one only reaches the same id.
  pub fn is_invalidated_by(&self, invalidated: &Tag) -> bool {
    self.kind == invalidated.kind && (invalidated.id.is_none() || self.id == invalidated.id)
  }
}

impl std::fmt::Display for Tag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.id {
      Some(id) => write!(f, "{}:{}", self.kind, id),
      None => f.write_str(self.kind),
    }
  }
}

/// Identifies a cached read.
pub trait QueryKey {
  /// Stable key for storage and in-flight deduplication
  fn cache_hash(&self) -> String;

  /// Human-readable description for logging
  fn description(&self) -> String;

  /// Tags this read provides
  fn tags(&self) -> Vec<Tag>;
}

/// Sent to subscribers whenever tags are invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
  pub tags: Vec<Tag>,
  /// Cache hashes of the reads that became stale, cached or in flight
  pub keys: Vec<String>,
}

impl Invalidation {
  pub fn affects(&self, key: &str) -> bool {
    self.keys.iter().any(|k| k == key)
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the network, possibly shared with concurrent callers
  Network,
  /// Served from a fresh cache entry
  Cache,
}
