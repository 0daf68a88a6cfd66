use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ApiError;

/// Number of books returned by the "latest books" read.
pub const LATEST_BOOKS_LIMIT: u32 = 6;

/// Fixed set of genres accepted by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
  Fiction,
  NonFiction,
  Science,
  History,
  Biography,
  Fantasy,
}

impl Genre {
  pub const ALL: [Genre; 6] = [
    Genre::Fiction,
    Genre::NonFiction,
    Genre::Science,
    Genre::History,
    Genre::Biography,
    Genre::Fantasy,
  ];

  /// Wire value, e.g. `NON_FICTION`
  pub fn as_str(self) -> &'static str {
    match self {
      Genre::Fiction => "FICTION",
      Genre::NonFiction => "NON_FICTION",
      Genre::Science => "SCIENCE",
      Genre::History => "HISTORY",
      Genre::Biography => "BIOGRAPHY",
      Genre::Fantasy => "FANTASY",
    }
  }

  /// Human-readable label
  pub fn label(self) -> &'static str {
    match self {
      Genre::Fiction => "Fiction",
      Genre::NonFiction => "Non-Fiction",
      Genre::Science => "Science",
      Genre::History => "History",
      Genre::Biography => "Biography",
      Genre::Fantasy => "Fantasy",
    }
  }
}

impl fmt::Display for Genre {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for Genre {
  type Err = String;

  /// Accepts the wire value or the label, case-insensitively (`non-fiction`, `NON_FICTION`).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
    Genre::ALL
      .into_iter()
      .find(|g| g.as_str() == normalized)
      .ok_or_else(|| {
        let valid: Vec<&str> = Genre::ALL.iter().map(|g| g.as_str()).collect();
        format!("unknown genre '{}' (expected one of {})", s, valid.join(", "))
      })
  }
}

/// A book as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
  #[serde(rename = "_id")]
  pub id: String,
  pub title: String,
  pub author: String,
  pub genre: Genre,
  pub isbn: String,
  #[serde(default)]
  pub description: String,
  pub copies: u32,
  #[serde(default)]
  pub available: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for a book that does not exist yet. The server assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
  pub title: String,
  pub author: String,
  pub genre: Genre,
  pub isbn: String,
  pub description: String,
  pub copies: u32,
}

impl NewBook {
  /// Reject payloads with blank required fields before anything is sent.
  pub fn validate(&self) -> Result<(), ApiError> {
    for (field, value) in [
      ("title", &self.title),
      ("author", &self.author),
      ("isbn", &self.isbn),
    ] {
      if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{} is required", field)));
      }
    }
    if self.copies == 0 {
      return Err(ApiError::Validation(
        "a new book needs at least 1 copy".to_string(),
      ));
    }
    Ok(())
  }
}

/// Partial update. Unset fields are left out of the request body so the
/// server keeps their current values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub genre: Option<Genre>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub isbn: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub copies: Option<u32>,
}

impl BookPatch {
  pub fn is_empty(&self) -> bool {
    *self == BookPatch::default()
  }

  pub fn validate(&self) -> Result<(), ApiError> {
    if self.is_empty() {
      return Err(ApiError::Validation("nothing to update".to_string()));
    }
    for (field, value) in [
      ("title", &self.title),
      ("author", &self.author),
      ("isbn", &self.isbn),
    ] {
      if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(ApiError::Validation(format!("{} cannot be blank", field)));
      }
    }
    Ok(())
  }
}

/// A borrow record as sent to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
  pub book: String,
  pub quantity: u32,
  pub due_date: NaiveDate,
}

impl BorrowRequest {
  /// Build a borrow record for `book`, checking the quantity against the
  /// copies the client last saw.
  pub fn for_book(book: &Book, quantity: u32, due_date: NaiveDate) -> Result<Self, ApiError> {
    if book.copies == 0 {
      return Err(ApiError::Validation(format!(
        "no copies of \"{}\" are available",
        book.title
      )));
    }
    if quantity == 0 {
      return Err(ApiError::Validation(
        "quantity must be at least 1".to_string(),
      ));
    }
    if quantity > book.copies {
      return Err(ApiError::Validation(format!(
        "cannot borrow more than {} copies of \"{}\"",
        book.copies, book.title
      )));
    }

    Ok(Self {
      book: book.id.clone(),
      quantity,
      due_date,
    })
  }
}

/// Total borrowed quantity for one book, aggregated by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowSummaryEntry {
  pub title: String,
  pub isbn: String,
  pub total_quantity: u32,
}

/// Server acknowledgement for writes that return no entity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Acknowledgement {
  #[serde(default = "default_success")]
  pub success: bool,
  #[serde(default)]
  pub message: Option<String>,
}

fn default_success() -> bool {
  true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
  Title,
  Author,
  Genre,
  Copies,
  CreatedAt,
  UpdatedAt,
}

impl SortField {
  pub fn as_str(self) -> &'static str {
    match self {
      SortField::Title => "title",
      SortField::Author => "author",
      SortField::Genre => "genre",
      SortField::Copies => "copies",
      SortField::CreatedAt => "createdAt",
      SortField::UpdatedAt => "updatedAt",
    }
  }
}

impl FromStr for SortField {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
      "title" => Ok(SortField::Title),
      "author" => Ok(SortField::Author),
      "genre" => Ok(SortField::Genre),
      "copies" => Ok(SortField::Copies),
      "createdat" | "created" => Ok(SortField::CreatedAt),
      "updatedat" | "updated" => Ok(SortField::UpdatedAt),
      _ => Err(format!("unknown sort field '{}'", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
  Asc,
  Desc,
}

impl SortOrder {
  pub fn as_str(self) -> &'static str {
    match self {
      SortOrder::Asc => "asc",
      SortOrder::Desc => "desc",
    }
  }
}

impl FromStr for SortOrder {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "asc" | "ascending" => Ok(SortOrder::Asc),
      "desc" | "descending" => Ok(SortOrder::Desc),
      _ => Err(format!("unknown sort order '{}' (expected asc or desc)", s)),
    }
  }
}

/// Filter, sort and pagination parameters for listing books.
/// Unset parameters are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BookQuery {
  pub genre: Option<Genre>,
  pub sort_by: Option<SortField>,
  pub sort: Option<SortOrder>,
  pub limit: Option<u32>,
}

impl BookQuery {
  /// The most recently created books, newest first
  pub fn latest() -> Self {
    Self {
      genre: None,
      sort_by: Some(SortField::CreatedAt),
      sort: Some(SortOrder::Desc),
      limit: Some(LATEST_BOOKS_LIMIT),
    }
  }

  /// Query string pairs in a fixed order
  pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(genre) = self.genre {
      pairs.push(("genre", genre.as_str().to_string()));
    }
    if let Some(sort_by) = self.sort_by {
      pairs.push(("sortBy", sort_by.as_str().to_string()));
    }
    if let Some(sort) = self.sort {
      pairs.push(("sort", sort.as_str().to_string()));
    }
    if let Some(limit) = self.limit {
      pairs.push(("limit", limit.to_string()));
    }
    pairs
  }
}
