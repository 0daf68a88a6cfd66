use async_trait::async_trait;

use crate::library::cache::LibraryQuery;
use crate::library::{BorrowSummaryEntry, CachedLibraryClient};
use crate::query::Query;
use crate::ui::renderfns::summary_table;
use crate::ui::view::{render_state, View};

pub struct BorrowSummaryView {
  query: Query<Vec<BorrowSummaryEntry>>,
}

impl BorrowSummaryView {
  pub fn new(library: CachedLibraryClient) -> Self {
    let events = library.subscribe();
    let mut query = Query::new(move || {
      let library = library.clone();
      async move { library.borrow_summary().await.map_err(|e| e.to_string()) }
    })
    .watch(&LibraryQuery::BorrowSummary, events);

    query.fetch();

    Self { query }
  }
}

#[async_trait]
impl View for BorrowSummaryView {
  fn breadcrumb_label(&self) -> String {
    "Borrow Summary".to_string()
  }

  fn render(&self) -> String {
    render_state(&self.query, "borrow summary", |entries| summary_table(entries))
  }

  fn tick(&mut self) -> bool {
    self.query.poll()
  }

  async fn settle(&mut self) {
    self.query.settle().await;
  }
}
