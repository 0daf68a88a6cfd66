use async_trait::async_trait;

use crate::query::{Query, QueryState};

/// Trait for views kept open in the shell.
///
/// Views load their data through a watched `Query<T>`, so a write that
/// invalidates their read makes the next `tick()` start a refetch.
#[async_trait]
pub trait View: Send {
  /// Label shown in the view's header
  fn breadcrumb_label(&self) -> String;

  /// Render the view's current state
  fn render(&self) -> String;

  /// Poll the view's query. Returns `true` if the view should be re-rendered.
  fn tick(&mut self) -> bool;

  /// Wait for a pending fetch to finish.
  async fn settle(&mut self);
}

/// Shared rendering of a query's loading and error states
pub fn render_state<T>(query: &Query<T>, what: &str, render: impl Fn(&T) -> String) -> String {
  match query.state() {
    QueryState::Idle => String::new(),
    QueryState::Loading => format!("Loading {}...\n", what),
    QueryState::Error(e) => format!("Error: {}\n", e),
    QueryState::Success(data) => render(data),
  }
}
