//! Cached library client that wraps LibraryClient with tag-based caching.

use chrono::NaiveDate;
use color_eyre::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::cache::{CacheLayer, CacheResult, Invalidation, MemoryStorage, NoopStorage, QueryKey};
use crate::config::Config;

use super::cache::{LibraryMutation, LibraryQuery};
use super::client::LibraryClient;
use super::error::ApiError;
use super::transport::HttpTransport;
use super::types::{
  Acknowledgement, Book, BookPatch, BookQuery, BorrowRequest, BorrowSummaryEntry, NewBook,
};

/// Library client with transparent caching support.
///
/// Reads are cached under their endpoint signature and deduplicated while in
/// flight. Every successful write invalidates the tags it affects, which
/// marks dependent reads stale and notifies subscribers.
#[derive(Clone)]
pub struct CachedLibraryClient {
  inner: LibraryClient,
  cache: CacheLayer<ApiError>,
}

impl CachedLibraryClient {
  /// Create a client for the configured service.
  pub fn new(config: &Config) -> Result<Self> {
    let stale_time = config.cache.stale_time()?;
    let transport = HttpTransport::new(&config.api)?;
    let inner = LibraryClient::new(Arc::new(transport));

    let cache = if config.cache.enabled {
      CacheLayer::new(MemoryStorage::new())
    } else {
      CacheLayer::new(NoopStorage)
    };
    let cache = cache.with_stale_time(stale_time);

    Ok(Self::with_parts(inner, cache))
  }

  pub fn with_parts(inner: LibraryClient, cache: CacheLayer<ApiError>) -> Self {
    Self { inner, cache }
  }

  /// Invalidation events, for consumers that re-fetch on change.
  pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
    self.cache.subscribe()
  }

  pub async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>, ApiError> {
    let key = LibraryQuery::Books(query.clone());
    let result = self
      .cache
      .fetch_list(&key, || {
        let inner = self.inner.clone();
        let query = query.clone();
        async move { inner.list_books(&query).await }
      })
      .await?;

    Ok(read(&key, result))
  }

  pub async fn get_book(&self, id: &str) -> Result<Book, ApiError> {
    let key = LibraryQuery::Book { id: id.to_string() };
    let result = self
      .cache
      .fetch_one(&key, || {
        let inner = self.inner.clone();
        let id = id.to_string();
        async move { inner.get_book(&id).await }
      })
      .await?;

    Ok(read(&key, result))
  }

  /// The six most recently created books.
  pub async fn latest_books(&self) -> Result<Vec<Book>, ApiError> {
    self.list_books(&BookQuery::latest()).await
  }

  pub async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
    let key = LibraryQuery::BorrowSummary;
    let result = self
      .cache
      .fetch_list(&key, || {
        let inner = self.inner.clone();
        async move { inner.borrow_summary().await }
      })
      .await?;

    Ok(read(&key, result))
  }

  pub async fn create_book(&self, book: &NewBook) -> Result<Book, ApiError> {
    book.validate()?;
    let created = self.inner.create_book(book).await?;
    info!(id = %created.id, title = %created.title, "book created");
    self.invalidate(LibraryMutation::CreateBook);
    Ok(created)
  }

  pub async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, ApiError> {
    patch.validate()?;
    let updated = self.inner.update_book(id, patch).await?;
    info!(id = %id, "book updated");
    self.invalidate(LibraryMutation::UpdateBook { id: id.to_string() });
    Ok(updated)
  }

  pub async fn delete_book(&self, id: &str) -> Result<Acknowledgement, ApiError> {
    let ack = self.inner.delete_book(id).await?;
    info!(id = %id, "book deleted");
    self.invalidate(LibraryMutation::DeleteBook { id: id.to_string() });
    Ok(ack)
  }

  /// Borrow `quantity` copies of `book`. The quantity is checked against the
  /// book's copies before any request is made.
  pub async fn borrow_book(
    &self,
    book: &Book,
    quantity: u32,
    due_date: NaiveDate,
  ) -> Result<Acknowledgement, ApiError> {
    let request = BorrowRequest::for_book(book, quantity, due_date)?;
    let ack = self.inner.borrow(&request).await?;
    info!(id = %book.id, quantity, due = %due_date, "book borrowed");
    self.invalidate(LibraryMutation::Borrow);
    Ok(ack)
  }

  fn invalidate(&self, mutation: LibraryMutation) {
    let stale = self.cache.invalidate(&mutation.invalidates());
    debug!(?mutation, stale = stale.len(), "cache invalidated after write");
  }
}

fn read<T>(key: &LibraryQuery, result: CacheResult<T>) -> T {
  match result.cached_at {
    Some(cached_at) => debug!(key = %key.description(), source = ?result.source, %cached_at, "read"),
    None => debug!(key = %key.description(), source = ?result.source, "read"),
  }
  result.data
}
