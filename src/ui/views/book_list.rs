use async_trait::async_trait;

use crate::library::cache::LibraryQuery;
use crate::library::{Book, BookQuery, CachedLibraryClient};
use crate::query::Query;
use crate::ui::renderfns::book_table;
use crate::ui::view::{render_state, View};

/// Books matching a filter, or the latest books
pub struct BookListView {
  label: String,
  query: Query<Vec<Book>>,
}

impl BookListView {
  pub fn new(label: impl Into<String>, filter: BookQuery, library: CachedLibraryClient) -> Self {
    let key = LibraryQuery::Books(filter.clone());
    let events = library.subscribe();
    let mut query = Query::new(move || {
      let library = library.clone();
      let filter = filter.clone();
      async move { library.list_books(&filter).await.map_err(|e| e.to_string()) }
    })
    .watch(&key, events);

    // Start fetching immediately
    query.fetch();

    Self {
      label: label.into(),
      query,
    }
  }

  pub fn latest(library: CachedLibraryClient) -> Self {
    Self::new("Latest Books", BookQuery::latest(), library)
  }
}

#[async_trait]
impl View for BookListView {
  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(books) => format!("{} ({})", self.label, books.len()),
      None => self.label.clone(),
    }
  }

  fn render(&self) -> String {
    render_state(&self.query, "books", |books| book_table(books))
  }

  fn tick(&mut self) -> bool {
    self.query.poll()
  }

  async fn settle(&mut self) {
    self.query.settle().await;
  }
}
