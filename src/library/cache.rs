//! Caching implementations for library types.

use sha2::{Digest, Sha256};

use crate::cache::{Cacheable, QueryKey, Tag};

use super::transport::ApiRequest;
use super::types::{Book, BookQuery, BorrowSummaryEntry};

pub const BOOKS: &str = "Books";
pub const BORROWS: &str = "Borrows";

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Book {
  fn entity_type() -> &'static str {
    "book"
  }
}

impl Cacheable for BorrowSummaryEntry {
  fn entity_type() -> &'static str {
    "borrow_summary"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Cached reads against the library service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryQuery {
  /// List books with filter/sort/limit parameters
  Books(BookQuery),
  /// Get a single book by id
  Book { id: String },
  /// Aggregated borrow summary
  BorrowSummary,
}

impl LibraryQuery {
  /// The request this read issues
  pub fn request(&self) -> ApiRequest {
    match self {
      Self::Books(query) => ApiRequest::get(&["api", "books"]).with_query(query.to_query_pairs()),
      Self::Book { id } => ApiRequest::get(&["api", "books", id.as_str()]),
      Self::BorrowSummary => ApiRequest::get(&["api", "borrow"]),
    }
  }
}

impl QueryKey for LibraryQuery {
  /// Hash of the endpoint signature, so reads that hit the same URL share
  /// a cache entry (e.g. "latest books" and the equivalent list query).
  fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.request().signature().as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    self.request().signature()
  }

  fn tags(&self) -> Vec<Tag> {
    match self {
      Self::Books(_) => vec![Tag::collection(BOOKS)],
      Self::Book { id } => vec![Tag::member(BOOKS, id.as_str())],
      Self::BorrowSummary => vec![Tag::collection(BORROWS)],
    }
  }
}

// ============================================================================
// Mutations
// ============================================================================

/// Writes against the library service and the tags each one invalidates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryMutation {
  CreateBook,
  UpdateBook { id: String },
  DeleteBook { id: String },
  /// Borrowing changes a book's copies as well as the summary
  Borrow,
}

impl LibraryMutation {
  pub fn invalidates(&self) -> Vec<Tag> {
    match self {
      Self::CreateBook | Self::DeleteBook { .. } => vec![Tag::collection(BOOKS)],
      Self::UpdateBook { id } => vec![Tag::member(BOOKS, id.as_str()), Tag::collection(BOOKS)],
      Self::Borrow => vec![Tag::collection(BOOKS), Tag::collection(BORROWS)],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::library::types::{Genre, SortField, SortOrder};

  #[test]
  fn test_latest_shares_key_with_equivalent_list() {
    let explicit = LibraryQuery::Books(BookQuery {
      genre: None,
      sort_by: Some(SortField::CreatedAt),
      sort: Some(SortOrder::Desc),
      limit: Some(6),
    });
    let latest = LibraryQuery::Books(BookQuery::latest());
    assert_eq!(explicit.cache_hash(), latest.cache_hash());
  }

  #[test]
  fn test_different_parameters_get_different_keys() {
    let all = LibraryQuery::Books(BookQuery::default());
    let fiction = LibraryQuery::Books(BookQuery {
      genre: Some(Genre::Fiction),
      ..Default::default()
    });
    assert_ne!(all.cache_hash(), fiction.cache_hash());
    assert_eq!(all.cache_hash().len(), 64);
  }

  #[test]
  fn test_description_is_the_endpoint_signature() {
    let query = LibraryQuery::Book {
      id: "42".to_string(),
    };
    assert_eq!(query.description(), "GET /api/books/42");
  }

  #[test]
  fn test_read_tags() {
    assert_eq!(
      LibraryQuery::Books(BookQuery::latest()).tags(),
      vec![Tag::collection(BOOKS)]
    );
    assert_eq!(
      LibraryQuery::Book {
        id: "1".to_string()
      }
      .tags(),
      vec![Tag::member(BOOKS, "1")]
    );
    assert_eq!(
      LibraryQuery::BorrowSummary.tags(),
      vec![Tag::collection(BORROWS)]
    );
  }

  #[test]
  fn test_borrow_invalidates_books_and_borrows() {
    assert_eq!(
      LibraryMutation::Borrow.invalidates(),
      vec![Tag::collection(BOOKS), Tag::collection(BORROWS)]
    );
  }

  #[test]
  fn test_update_invalidates_member_and_collection() {
    let tags = LibraryMutation::UpdateBook {
      id: "7".to_string(),
    }
    .invalidates();
    assert_eq!(tags, vec![Tag::member(BOOKS, "7"), Tag::collection(BOOKS)]);
  }

  #[test]
  fn test_create_and_delete_invalidate_books_only() {
    for mutation in [
      LibraryMutation::CreateBook,
      LibraryMutation::DeleteBook {
        id: "1".to_string(),
      },
    ] {
      assert_eq!(mutation.invalidates(), vec![Tag::collection(BOOKS)]);
    }
  }
}
