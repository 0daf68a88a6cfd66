//! In-memory stand-in for the library service, used by tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Mutex;

use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use super::types::{Book, Genre, NewBook};

#[derive(Default)]
struct FakeState {
  books: Vec<Book>,
  /// (book id, quantity) in the order they were borrowed
  borrows: Vec<(String, u32)>,
  next_id: u64,
}

/// Implements the REST contract the client expects and records every
/// request it receives.
#[derive(Default)]
pub struct FakeServer {
  state: Mutex<FakeState>,
  requests: Mutex<Vec<ApiRequest>>,
  latency: Option<std::time::Duration>,
  offline: AtomicBool,
  /// Canned responses that replace the normal handling of a route
  canned: Mutex<Vec<(Method, String, u16, Value)>>,
}

impl FakeServer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Delay every response, so concurrent reads overlap
  pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
    self.latency = Some(latency);
    self
  }

  /// Fail every request with a transport error while set
  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, AtomicOrdering::SeqCst);
  }

  /// Answer every `method` request to `path` with this status and body
  pub fn respond_with(&self, method: Method, path: &str, status: u16, body: Value) {
    self
      .canned
      .lock()
      .unwrap()
      .push((method, path.to_string(), status, body));
  }

  /// Insert a book directly, bypassing the request log
  pub fn seed(&self, book: NewBook) -> Book {
    let mut state = self.state.lock().unwrap();
    let book = state.insert(book);
    state.books.push(book.clone());
    book
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self.requests.lock().unwrap().clone()
  }

  /// Number of requests received with this method and path
  pub fn count(&self, method: Method, path: &str) -> usize {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.method == method && r.path() == path)
      .count()
  }

  pub fn book(&self, id: &str) -> Option<Book> {
    let state = self.state.lock().unwrap();
    state.books.iter().find(|b| b.id == id).cloned()
  }

  fn handle(&self, request: &ApiRequest) -> (u16, Value) {
    let path = request.path();
    let canned = self.canned.lock().unwrap();
    if let Some((_, _, status, body)) = canned
      .iter()
      .find(|(method, p, _, _)| *method == request.method && *p == path)
    {
      return (*status, body.clone());
    }
    drop(canned);

    let mut state = self.state.lock().unwrap();
    let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();

    match (request.method, segments.as_slice()) {
      (Method::Get, ["api", "books"]) => {
        let books = state.list(&request.query);
        (200, json!({"success": true, "data": books}))
      }
      (Method::Get, ["api", "books", id]) => match state.books.iter().find(|b| b.id == *id) {
        Some(book) => (200, json!({"success": true, "book": book})),
        None => not_found(),
      },
      (Method::Post, ["api", "books"]) => {
        let body = request.body.clone().unwrap_or(Value::Null);
        match serde_json::from_value::<NewBookBody>(body) {
          Ok(body) => {
            let book = state.insert(body.into());
            state.books.push(book.clone());
            (201, json!({"success": true, "data": book}))
          }
          Err(e) => (400, json!({"success": false, "message": e.to_string()})),
        }
      }
      (Method::Put, ["api", "books", id]) => {
        let patch = match &request.body {
          Some(Value::Object(fields)) => fields.clone(),
          _ => return (400, json!({"success": false, "message": "Invalid body"})),
        };
        match state.update(id, patch) {
          Some(book) => (200, json!({"success": true, "data": book})),
          None => not_found(),
        }
      }
      (Method::Delete, ["api", "books", id]) => {
        let before = state.books.len();
        state.books.retain(|b| b.id != *id);
        if state.books.len() == before {
          not_found()
        } else {
          (200, json!({"success": true, "message": "Book deleted successfully"}))
        }
      }
      (Method::Post, ["api", "borrow"]) => state.borrow(request.body.as_ref()),
      (Method::Get, ["api", "borrow"]) => {
        let summary = state.summary();
        (200, json!({"success": true, "data": summary}))
      }
      _ => (404, json!({"success": false, "message": "Route not found"})),
    }
  }
}

#[async_trait]
impl Transport for FakeServer {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
    self.requests.lock().unwrap().push(request.clone());
    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }
    if self.offline.load(AtomicOrdering::SeqCst) {
      return Err(ApiError::Network("connection refused".to_string()));
    }

    let (status, body) = self.handle(&request);
    Ok(ApiResponse {
      status,
      body: serde_json::to_vec(&body).unwrap(),
    })
  }
}

#[derive(serde::Deserialize)]
struct NewBookBody {
  title: String,
  author: String,
  genre: Genre,
  isbn: String,
  #[serde(default)]
  description: String,
  copies: u32,
}

impl From<NewBookBody> for NewBook {
  fn from(body: NewBookBody) -> Self {
    NewBook {
      title: body.title,
      author: body.author,
      genre: body.genre,
      isbn: body.isbn,
      description: body.description,
      copies: body.copies,
    }
  }
}

fn not_found() -> (u16, Value) {
  (404, json!({"success": false, "message": "Book not found"}))
}

fn epoch() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

impl FakeState {
  /// Assign an id and a creation time that increases with each book
  fn insert(&mut self, book: NewBook) -> Book {
    self.next_id += 1;
    let created_at = epoch() + Duration::minutes(self.next_id as i64);
    Book {
      id: format!("book-{}", self.next_id),
      title: book.title,
      author: book.author,
      genre: book.genre,
      isbn: book.isbn,
      description: book.description,
      copies: book.copies,
      available: book.copies > 0,
      created_at: Some(created_at),
      updated_at: Some(created_at),
    }
  }

  fn list(&self, query: &[(&'static str, String)]) -> Vec<Book> {
    let param = |name: &str| {
      query
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
    };

    let mut books: Vec<Book> = self
      .books
      .iter()
      .filter(|b| param("genre").map_or(true, |g| b.genre.as_str() == g))
      .cloned()
      .collect();

    if let Some(field) = param("sortBy") {
      let descending = param("sort") == Some("desc");
      books.sort_by(|a, b| {
        let ordering = compare_field(a, b, field);
        if descending {
          ordering.reverse()
        } else {
          ordering
        }
      });
    }

    if let Some(limit) = param("limit").and_then(|l| l.parse::<usize>().ok()) {
      books.truncate(limit);
    }
    books
  }

  /// Merge the given fields into the stored book
  fn update(&mut self, id: &str, fields: Map<String, Value>) -> Option<Book> {
    let book = self.books.iter_mut().find(|b| b.id == id)?;
    let mut value = serde_json::to_value(&*book).ok()?;
    if let Value::Object(current) = &mut value {
      for (key, field) in fields {
        current.insert(key, field);
      }
    }
    let mut updated: Book = serde_json::from_value(value).ok()?;
    updated.available = updated.copies > 0;
    updated.updated_at = updated.updated_at.map(|t| t + Duration::seconds(1));
    *book = updated.clone();
    Some(updated)
  }

  fn borrow(&mut self, body: Option<&Value>) -> (u16, Value) {
    let Some(body) = body else {
      return (400, json!({"success": false, "message": "Missing body"}));
    };
    let id = body["book"].as_str().unwrap_or_default().to_string();
    let quantity = body["quantity"].as_u64().unwrap_or_default() as u32;
    if body["dueDate"].as_str().is_none() {
      return (400, json!({"success": false, "message": "dueDate is required"}));
    }

    let Some(book) = self.books.iter_mut().find(|b| b.id == id) else {
      return not_found();
    };
    if quantity == 0 || quantity > book.copies {
      return (400, json!({"success": false, "message": "Not enough copies available"}));
    }
    book.copies -= quantity;
    book.available = book.copies > 0;
    self.borrows.push((id, quantity));

    (201, json!({"success": true, "message": "Book borrowed successfully"}))
  }

  /// Aggregate borrowed quantities per book, in order of first borrow
  fn summary(&self) -> Vec<Value> {
    let mut totals: Vec<(String, u32)> = Vec::new();
    for (id, quantity) in &self.borrows {
      match totals.iter_mut().find(|(seen, _)| seen == id) {
        Some((_, total)) => *total += quantity,
        None => totals.push((id.clone(), *quantity)),
      }
    }

    totals
      .into_iter()
      .map(|(id, total)| {
        let (title, isbn) = self
          .books
          .iter()
          .find(|b| b.id == id)
          .map(|b| (b.title.clone(), b.isbn.clone()))
          .unwrap_or_default();
        json!({"totalQuantity": total, "book": {"title": title, "isbn": isbn}})
      })
      .collect()
  }
}

fn compare_field(a: &Book, b: &Book, field: &str) -> Ordering {
  match field {
    "title" => a.title.cmp(&b.title),
    "author" => a.author.cmp(&b.author),
    "genre" => a.genre.as_str().cmp(b.genre.as_str()),
    "copies" => a.copies.cmp(&b.copies),
    "updatedAt" => a.updated_at.cmp(&b.updated_at),
    _ => a.created_at.cmp(&b.created_at),
  }
}
