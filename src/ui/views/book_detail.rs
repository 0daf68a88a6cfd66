use async_trait::async_trait;

use crate::library::cache::LibraryQuery;
use crate::library::{Book, CachedLibraryClient};
use crate::query::Query;
use crate::ui::renderfns::book_detail;
use crate::ui::view::{render_state, View};

/// View for displaying one book
pub struct BookDetailView {
  id: String,
  query: Query<Book>,
}

impl BookDetailView {
  pub fn new(id: String, library: CachedLibraryClient) -> Self {
    let key = LibraryQuery::Book { id: id.clone() };
    let events = library.subscribe();
    let book_id = id.clone();
    let mut query = Query::new(move || {
      let library = library.clone();
      let id = book_id.clone();
      async move { library.get_book(&id).await.map_err(|e| e.to_string()) }
    })
    .watch(&key, events);

    query.fetch();

    Self { id, query }
  }
}

#[async_trait]
impl View for BookDetailView {
  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(book) => format!("Book {} ({})", book.title, self.id),
      None => format!("Book {}", self.id),
    }
  }

  fn render(&self) -> String {
    render_state(&self.query, "book", |book| book_detail(book))
  }

  fn tick(&mut self) -> bool {
    self.query.poll()
  }

  async fn settle(&mut self) {
    self.query.settle().await;
  }
}
