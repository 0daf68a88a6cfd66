//! Client for the library management service.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod transport;
pub mod types;

pub use cached_client::CachedLibraryClient;
pub use types::{Book, BookPatch, BookQuery, BorrowSummaryEntry, Genre, NewBook, SortField, SortOrder};
