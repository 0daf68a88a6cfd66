//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::storage::{CacheStorage, CachedEntry};
use super::traits::{CacheResult, Cacheable, Invalidation, QueryKey, Tag};

type SharedFetch<E> = Shared<BoxFuture<'static, Result<Value, E>>>;

/// A read currently on the network.
struct InFlight<E> {
  fetch: SharedFetch<E>,
  tags: Vec<Tag>,
  /// Set when one of the read's tags is invalidated before it resolves
  invalidated: Arc<AtomicBool>,
}

type InFlightTable<E> = Arc<Mutex<HashMap<String, InFlight<E>>>>;

/// Cache layer that manages caching logic and network fetching.
///
/// Reads are served from storage while fresh. Otherwise they go to the
/// network, and identical concurrent reads share a single request. Writes
/// invalidate tags, which marks matching entries stale and notifies
/// subscribers.
pub struct CacheLayer<E> {
  storage: Arc<dyn CacheStorage>,
  in_flight: InFlightTable<E>,
  events: broadcast::Sender<Invalidation>,
  /// How long before cached data is considered stale
  stale_time: Duration,
  _error: PhantomData<fn() -> E>,
}

impl<E> CacheLayer<E>
where
  E: Clone + Send + Sync + From<serde_json::Error> + 'static,
{
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    let (events, _) = broadcast::channel(64);
    Self {
      storage: Arc::new(storage),
      in_flight: Arc::new(Mutex::new(HashMap::new())),
      events,
      stale_time: Duration::seconds(60),
      _error: PhantomData,
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Receive an [`Invalidation`] for every future call to [`invalidate`](Self::invalidate).
  pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
    self.events.subscribe()
  }

  fn is_fresh(&self, entry: &CachedEntry) -> bool {
    !entry.stale && Utc::now() - entry.cached_at <= self.stale_time
  }

  /// Fetch a list with cache-first strategy.
  pub async fn fetch_list<T, K, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<Vec<T>>, E>
  where
    T: Cacheable,
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
  {
    self.fetch_value(key, T::entity_type(), fetcher).await
  }

  /// Fetch a single entity with cache-first strategy.
  pub async fn fetch_one<T, K, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, E>
  where
    T: Cacheable,
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    self.fetch_value(key, T::entity_type(), fetcher).await
  }

  /// 1. Fresh cache entry of the right type: return it
  /// 2. Same read already in flight: wait for it
  /// 3. Otherwise: fetch, store, return
  async fn fetch_value<V, K, F, Fut>(
    &self,
    key: &K,
    entity_type: &'static str,
    fetcher: F,
  ) -> Result<CacheResult<V>, E>
  where
    V: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
  {
    let hash = key.cache_hash();

    if let Some(entry) = self.storage.get(&hash) {
      if entry.entity_type == entity_type && self.is_fresh(&entry) {
        trace!(key = %key.description(), "cache hit");
        let data = serde_json::from_value(entry.value)?;
        return Ok(CacheResult::from_cache(data, entry.cached_at));
      }
    }

    let fetch = self.join_or_start(key, hash, entity_type, fetcher);
    let value = fetch.await?;
    Ok(CacheResult::from_network(serde_json::from_value(value)?))
  }

  fn join_or_start<V, K, F, Fut>(
    &self,
    key: &K,
    hash: String,
    entity_type: &'static str,
    fetcher: F,
  ) -> SharedFetch<E>
  where
    V: serde::Serialize + Send + 'static,
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
  {
    let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = in_flight.get(&hash) {
      debug!(key = %key.description(), "joining in-flight request");
      return existing.fetch.clone();
    }

    debug!(key = %key.description(), "cache miss, fetching");
    let tags = key.tags();
    let invalidated = Arc::new(AtomicBool::new(false));
    let request = fetcher();

    // Storing and unregistering happen inside the shared future so they run
    // even when the caller that started the read stops waiting for it. Both
    // happen under the in-flight lock, so an invalidation sees the read either
    // in the table or in storage.
    let fetch = {
      let storage = Arc::clone(&self.storage);
      let table = Arc::clone(&self.in_flight);
      let invalidated = Arc::clone(&invalidated);
      let tags = tags.clone();
      let hash = hash.clone();
      async move {
        let result = match request.await {
          Ok(data) => serde_json::to_value(&data).map_err(E::from),
          Err(e) => Err(e),
        };

        let mut in_flight = table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(value) = &result {
          storage.store(
            &hash,
            CachedEntry {
              value: value.clone(),
              entity_type,
              tags,
              cached_at: Utc::now(),
              stale: invalidated.load(Ordering::SeqCst),
            },
          );
        }
        in_flight.remove(&hash);
        drop(in_flight);
        result
      }
      .boxed()
      .shared()
    };

    in_flight.insert(
      hash,
      InFlight {
        fetch: fetch.clone(),
        tags,
        invalidated,
      },
    );
    fetch
  }

  /// Mark every cached or in-flight read carrying one of `tags` as stale and
  /// notify subscribers. Returns the affected keys.
  pub fn invalidate(&self, tags: &[Tag]) -> Vec<String> {
    let keys = {
      let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
      let mut keys = self.storage.invalidate(tags);
      for (hash, read) in in_flight.iter() {
        let affected = read
          .tags
          .iter()
          .any(|tag| tags.iter().any(|inv| tag.is_invalidated_by(inv)));
        if affected {
          read.invalidated.store(true, Ordering::SeqCst);
          if !keys.contains(hash) {
            keys.push(hash.clone());
          }
        }
      }
      keys
    };

    let tag_list: Vec<String> = tags.iter().map(ToString::to_string).collect();
    debug!(tags = %tag_list.join(","), stale = keys.len(), "invalidated tags");

    // No receivers is fine
    let _ = self.events.send(Invalidation {
      tags: tags.to_vec(),
      keys: keys.clone(),
    });
    keys
  }
}

impl<E> Clone for CacheLayer<E> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      in_flight: Arc::clone(&self.in_flight),
      events: self.events.clone(),
      stale_time: self.stale_time,
      _error: PhantomData,
    }
  }
}
