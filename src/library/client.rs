use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::api_types::{
  ApiBookEnvelope, ApiBookPatch, ApiBorrowSummaryItem, ApiErrorBody, ApiNewBook, ApiPayload,
};
use super::cache::LibraryQuery;
use super::error::ApiError;
use super::transport::{ApiRequest, Transport};
use super::types::{
  Acknowledgement, Book, BookPatch, BookQuery, BorrowRequest, BorrowSummaryEntry, NewBook,
};

/// Library service API client. One method per endpoint, no caching.
#[derive(Clone)]
pub struct LibraryClient {
  transport: Arc<dyn Transport>,
}

impl LibraryClient {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  /// List books matching the filter, in server order
  pub async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>, ApiError> {
    let request = LibraryQuery::Books(query.clone()).request();
    let payload: ApiPayload<Vec<Book>> = self.execute(request).await?;
    Ok(payload.into_inner())
  }

  /// Get a single book by id
  pub async fn get_book(&self, id: &str) -> Result<Book, ApiError> {
    let request = LibraryQuery::Book { id: id.to_string() }.request();
    let path = request.path();
    let envelope: ApiBookEnvelope<Book> = self.execute(request).await?;

    envelope.book.ok_or(ApiError::NotFound {
      path,
      message: envelope.message,
    })
  }

  /// Create a book; the server assigns its id
  pub async fn create_book(&self, book: &NewBook) -> Result<Book, ApiError> {
    let body = serde_json::to_value(ApiNewBook::from(book))?;
    let payload: ApiPayload<Book> = self
      .execute(ApiRequest::post(&["api", "books"], body))
      .await?;
    Ok(payload.into_inner())
  }

  /// Update the fields set in `patch`, leaving the rest untouched
  pub async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, ApiError> {
    let body = serde_json::to_value(ApiBookPatch::from(patch))?;
    let payload: ApiPayload<Book> = self
      .execute(ApiRequest::put(&["api", "books", id], body))
      .await?;
    Ok(payload.into_inner())
  }

  pub async fn delete_book(&self, id: &str) -> Result<Acknowledgement, ApiError> {
    self
      .execute(ApiRequest::delete(&["api", "books", id]))
      .await
  }

  pub async fn borrow(&self, request: &BorrowRequest) -> Result<Acknowledgement, ApiError> {
    let body = serde_json::to_value(request)?;
    self
      .execute(ApiRequest::post(&["api", "borrow"], body))
      .await
  }

  /// Total borrowed quantity per book
  pub async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
    let request = LibraryQuery::BorrowSummary.request();
    let payload: ApiPayload<Vec<ApiBorrowSummaryItem>> = self.execute(request).await?;
    Ok(
      payload
        .into_inner()
        .into_iter()
        .map(BorrowSummaryEntry::from)
        .collect(),
    )
  }

  /// The most recently created books, newest first
  pub async fn latest_books(&self) -> Result<Vec<Book>, ApiError> {
    self.list_books(&BookQuery::latest()).await
  }

  /// Send a request and decode a 2xx body. Non-2xx responses become
  /// `NotFound` (404) or `Server` errors carrying the body's `message`.
  async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
    let signature = request.signature();
    let path = request.path();
    debug!(request = %signature, "sending request");

    let response = match self.transport.send(request).await {
      Ok(response) => response,
      Err(e) => {
        warn!(request = %signature, error = %e, "request failed");
        return Err(e);
      }
    };

    if !response.is_success() {
      let message = serde_json::from_slice::<ApiErrorBody>(&response.body)
        .unwrap_or_default()
        .message;
      let error = if response.status == 404 {
        ApiError::NotFound { path, message }
      } else {
        ApiError::Server {
          status: response.status,
          message,
        }
      };
      warn!(request = %signature, status = response.status, error = %error, "request rejected");
      return Err(error);
    }

    debug!(request = %signature, status = response.status, "request succeeded");

    // Empty bodies (e.g. 204 on delete) decode like an empty object
    let body: Value = if response.body.is_empty() {
      Value::Object(Default::default())
    } else {
      serde_json::from_slice(&response.body)?
    };
    serde_json::from_value(body).map_err(|e| {
      warn!(request = %signature, error = %e, "unexpected response body");
      ApiError::Decode(e.to_string())
    })
  }
}
