//! Serde types matching the library service's request and response bodies.
//!
//! Envelopes differ per endpoint: lists and writes wrap their payload under
//! `data`, the single-book read wraps it under `book`, and some deployments
//! return bare arrays. These types unwrap each shape into domain types.

use serde::{Deserialize, Serialize};

use super::types::{BookPatch, BorrowSummaryEntry, Genre, NewBook};

// ============================================================================
// Response envelopes
// ============================================================================

/// Payload wrapped under `data`, or sent bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiPayload<T> {
  Wrapped { data: T },
  Bare(T),
}

impl<T> ApiPayload<T> {
  pub fn into_inner(self) -> T {
    match self {
      ApiPayload::Wrapped { data } => data,
      ApiPayload::Bare(data) => data,
    }
  }
}

/// Single-book read: `{ "book": { ... } }`. A missing or null `book` means
/// the id did not match.
#[derive(Debug, Deserialize)]
pub struct ApiBookEnvelope<T> {
  pub book: Option<T>,
  #[serde(default)]
  pub message: Option<String>,
}

/// Body of a non-2xx response
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: Option<String>,
}

// ============================================================================
// Borrow summary
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiSummaryBook {
  pub title: String,
  #[serde(default)]
  pub isbn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBorrowSummaryItem {
  pub total_quantity: u32,
  pub book: ApiSummaryBook,
}

impl From<ApiBorrowSummaryItem> for BorrowSummaryEntry {
  fn from(item: ApiBorrowSummaryItem) -> Self {
    BorrowSummaryEntry {
      title: item.book.title,
      isbn: item.book.isbn,
      total_quantity: item.total_quantity,
    }
  }
}

// ============================================================================
// Request bodies
// ============================================================================

/// Create-book body. `available` mirrors `copies > 0`.
#[derive(Debug, Serialize)]
pub struct ApiNewBook<'a> {
  pub title: &'a str,
  pub author: &'a str,
  pub genre: Genre,
  pub isbn: &'a str,
  pub description: &'a str,
  pub copies: u32,
  pub available: bool,
}

impl<'a> From<&'a NewBook> for ApiNewBook<'a> {
  fn from(book: &'a NewBook) -> Self {
    Self {
      title: &book.title,
      author: &book.author,
      genre: book.genre,
      isbn: &book.isbn,
      description: &book.description,
      copies: book.copies,
      available: book.copies > 0,
    }
  }
}

/// Update-book body. `available` is only sent when `copies` is.
#[derive(Debug, Serialize)]
pub struct ApiBookPatch<'a> {
  #[serde(flatten)]
  pub patch: &'a BookPatch,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub available: Option<bool>,
}

impl<'a> From<&'a BookPatch> for ApiBookPatch<'a> {
  fn from(patch: &'a BookPatch) -> Self {
    Self {
      patch,
      available: patch.copies.map(|copies| copies > 0),
    }
  }
}
