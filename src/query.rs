//! Async query abstraction for mounted views.
//!
//! A `Query<T>` owns a fetcher, its loading/success/error state and an
//! optional subscription to cache invalidations. A watched query re-issues
//! its fetch when an invalidation reaches its key, so whatever renders it
//! always shows data read after the last relevant write.
//!
//! # Example
//!
//! ```ignore
//! let library = client.clone();
//! let mut query = Query::new(move || {
//!     let library = library.clone();
//!     async move { library.borrow_summary().await.map_err(|e| e.to_string()) }
//! })
//! .watch(&LibraryQuery::BorrowSummary, client.subscribe());
//!
//! query.fetch();
//!
//! // After every command
//! if query.poll() {
//!     query.settle().await;
//!     render(query.state());
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::cache::{Invalidation, QueryKey, Tag};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Invalidation subscription for one cached read
struct Watch {
  key: String,
  tags: Vec<Tag>,
  events: broadcast::Receiver<Invalidation>,
}

impl Watch {
  fn is_affected_by(&self, invalidation: &Invalidation) -> bool {
    invalidation.affects(&self.key)
      || self
        .tags
        .iter()
        .any(|tag| invalidation.tags.iter().any(|inv| tag.is_invalidated_by(inv)))
  }

  /// Drain pending events; true if any of them concerns this read.
  fn take_invalidated(&mut self) -> bool {
    let mut invalidated = false;
    loop {
      match self.events.try_recv() {
        Ok(event) => invalidated |= self.is_affected_by(&event),
        // Missed events may have concerned us
        Err(broadcast::error::TryRecvError::Lagged(_)) => invalidated = true,
        Err(broadcast::error::TryRecvError::Empty)
        | Err(broadcast::error::TryRecvError::Closed) => break,
      }
    }
    invalidated
  }
}

/// Async query for data fetching with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/success/error states
/// - Async result handling via channels
/// - Refetching when the read it mirrors is invalidated
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  watch: Option<Watch>,
}

impl<T> Query<T> {
  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      watch: None,
    }
  }

  /// Refetch whenever an invalidation reaches `key`.
  pub fn watch<K: QueryKey>(mut self, key: &K, events: broadcast::Receiver<Invalidation>) -> Self {
    self.watch = Some(Watch {
      key: key.cache_hash(),
      tags: key.tags(),
      events,
    });
    self
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  pub fn refetch(&mut self) {
    // Cancel any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch();
  }

  /// Check for invalidations and for results from a pending fetch.
  ///
  /// Returns `true` if the state changed: a refetch started because the
  /// watched key was invalidated, or data or an error arrived.
  pub fn poll(&mut self) -> bool {
    let invalidated = self
      .watch
      .as_mut()
      .map(Watch::take_invalidated)
      .unwrap_or(false);
    if invalidated {
      debug!("mounted query invalidated, refetching");
      self.refetch();
      return true;
    }

    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(result) => {
        self.apply(result);
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  /// Wait for the pending fetch, if any, to finish.
  ///
  /// Returns `true` if the state changed.
  pub async fn settle(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.recv().await {
      Some(result) => self.apply(result),
      None => {
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
      }
    }
    true
  }

  fn apply(&mut self, result: Result<T, String>) {
    match result {
      Ok(data) => self.state = QueryState::Success(data),
      Err(error) => self.state = QueryState::Error(error),
    }
    self.receiver = None;
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("watching", &self.watch.as_ref().map(|w| &w.key))
      .finish_non_exhaustive()
  }
}
