use chrono::{Local, NaiveDate};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use tracing::debug;

use crate::cli::{Action, OpenTarget, ShellCommand, ShellLine};
use crate::commands;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::library::{BookQuery, CachedLibraryClient, NewBook};
use crate::ui::renderfns::{book_detail, book_table, header, help, summary_table};
use crate::ui::views::{BookDetailView, BookListView, BorrowSummaryView};
use crate::ui::View;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  /// The next line answers "delete this book?"
  ConfirmDelete { id: String, title: String },
}

/// Main application state
pub struct App {
  /// Mounted views, re-rendered whenever their data is invalidated
  views: Vec<Box<dyn View>>,

  /// Current input mode
  mode: Mode,

  /// Application configuration
  config: Config,

  library: CachedLibraryClient,

  out: Box<dyn Write + Send>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config, out: Box<dyn Write + Send>) -> Result<Self> {
    let library = CachedLibraryClient::new(&config)?;
    Ok(Self::with_client(library, config, out))
  }

  pub fn with_client(library: CachedLibraryClient, config: Config, out: Box<dyn Write + Send>) -> Self {
    Self {
      views: Vec::new(),
      mode: Mode::Normal,
      config,
      library,
      out,
      should_quit: false,
    }
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }

  pub fn awaiting_confirmation(&self) -> bool {
    matches!(self.mode, Mode::ConfirmDelete { .. })
  }

  /// Run a single command given on the command line. A delete without
  /// `--yes` reads its confirmation from `confirm`.
  pub async fn run_once(
    &mut self,
    action: Action,
    confirm: impl FnOnce() -> EventHandler,
  ) -> Result<()> {
    self.execute(action).await?;

    if self.awaiting_confirmation() {
      let mut events = confirm();
      let answer = match events.next().await {
        Some(Event::Input(line)) => line,
        _ => String::new(),
      };
      self.confirm(&answer).await?;
    }
    Ok(())
  }

  /// Interactive session: one command per line until `quit` or end of input.
  pub async fn run_shell(&mut self, events: &mut EventHandler) -> Result<()> {
    writeln!(
      self.out,
      "bookshelf shell on {}. Type `help` for commands, `quit` to exit.",
      self.config.api.url
    )?;
    self.prompt()?;

    while !self.should_quit() {
      match events.next().await {
        Some(Event::Input(line)) => {
          self.handle_line(&line).await?;
          if !self.should_quit() {
            self.prompt()?;
          }
        }
        Some(Event::Eof) | None => break,
      }
    }

    Ok(())
  }

  fn prompt(&mut self) -> Result<()> {
    if !self.awaiting_confirmation() {
      write!(self.out, "bookshelf> ")?;
    }
    self.out.flush()?;
    Ok(())
  }

  /// Handle one shell line. Command failures are printed and the session
  /// continues; only output errors are returned.
  pub async fn handle_line(&mut self, line: &str) -> Result<()> {
    let outcome = if self.awaiting_confirmation() {
      self.confirm(line).await
    } else {
      self.handle_command(line).await
    };
    if let Err(e) = outcome {
      writeln!(self.out, "Error: {}", e)?;
    }

    self.refresh_views().await
  }

  async fn handle_command(&mut self, line: &str) -> Result<()> {
    let mut words = commands::split_args(line).map_err(|e| eyre!(e))?;
    let Some(first) = words.first() else {
      return Ok(());
    };

    let Some(command) = commands::resolve(first) else {
      let first = first.clone();
      return self.suggest(&first);
    };
    words[0] = command.name.to_string();

    match ShellLine::try_parse_from(&words) {
      Ok(parsed) => self.dispatch(parsed.command).await,
      Err(e) => {
        // Also covers `--help`
        write!(self.out, "{}", e.render())?;
        Ok(())
      }
    }
  }

  fn suggest(&mut self, input: &str) -> Result<()> {
    let suggestions: Vec<&str> = commands::get_suggestions(input)
      .into_iter()
      .take(3)
      .map(|cmd| cmd.name)
      .collect();

    if suggestions.is_empty() {
      writeln!(self.out, "Unknown command '{}'. Type `help` for a list.", input)?;
    } else {
      writeln!(
        self.out,
        "Unknown command '{}'. Did you mean: {}?",
        input,
        suggestions.join(", ")
      )?;
    }
    Ok(())
  }

  async fn dispatch(&mut self, command: ShellCommand) -> Result<()> {
    match command {
      ShellCommand::Action(action) => self.execute(action).await,
      ShellCommand::Open { target } => self.open(target).await,
      ShellCommand::Close => {
        let closed = self.views.len();
        self.views.clear();
        writeln!(self.out, "Closed {} view(s).", closed)?;
        Ok(())
      }
      ShellCommand::Help => {
        write!(self.out, "{}", help(commands::COMMANDS))?;
        Ok(())
      }
      ShellCommand::Quit => {
        self.should_quit = true;
        Ok(())
      }
    }
  }

  /// Perform one library operation and print its result.
  pub async fn execute(&mut self, action: Action) -> Result<()> {
    debug!(?action, "executing");
    match action {
      Action::List(args) => {
        let books = self.library.list_books(&BookQuery::from(&args)).await?;
        write!(self.out, "{}", book_table(&books))?;
      }
      Action::Latest => {
        let books = self.library.latest_books().await?;
        write!(self.out, "{}", book_table(&books))?;
      }
      Action::Show { id } => {
        let book = self.library.get_book(&id).await?;
        write!(self.out, "{}", book_detail(&book))?;
      }
      Action::Add(args) => {
        let book = self.library.create_book(&NewBook::from(args)).await?;
        writeln!(self.out, "Added \"{}\" ({}).", book.title, book.id)?;
      }
      Action::Edit(args) => {
        let book = self.library.update_book(&args.id, &args.patch()).await?;
        writeln!(self.out, "Updated \"{}\".", book.title)?;
        write!(self.out, "{}", book_detail(&book))?;
      }
      Action::Delete { id, yes: true } => {
        self.library.delete_book(&id).await?;
        writeln!(self.out, "Deleted book {}.", id)?;
      }
      Action::Delete { id, yes: false } => {
        let book = self.library.get_book(&id).await?;
        write!(self.out, "Delete \"{}\" ({})? [y/N] ", book.title, book.id)?;
        self.out.flush()?;
        self.mode = Mode::ConfirmDelete {
          id: book.id,
          title: book.title,
        };
      }
      Action::Borrow { id, quantity, due } => {
        let book = self.library.get_book(&id).await?;
        let due = due.unwrap_or_else(|| self.default_due_date());
        self.library.borrow_book(&book, quantity, due).await?;
        writeln!(
          self.out,
          "Borrowed {} of \"{}\", due {}.",
          quantity, book.title, due
        )?;

        let summary = self.library.borrow_summary().await?;
        write!(
          self.out,
          "{}{}",
          header(&self.config.api.url, "Borrow Summary"),
          summary_table(&summary)
        )?;
      }
      Action::Summary => {
        let summary = self.library.borrow_summary().await?;
        write!(self.out, "{}", summary_table(&summary))?;
      }
    }
    Ok(())
  }

  async fn confirm(&mut self, answer: &str) -> Result<()> {
    let Mode::ConfirmDelete { id, title } = std::mem::replace(&mut self.mode, Mode::Normal) else {
      return Ok(());
    };

    if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
      self.library.delete_book(&id).await?;
      writeln!(self.out, "Deleted \"{}\".", title)?;
    } else {
      writeln!(self.out, "Cancelled.")?;
    }
    Ok(())
  }

  fn default_due_date(&self) -> NaiveDate {
    Local::now().date_naive() + chrono::Duration::days(i64::from(self.config.borrow.due_in_days))
  }

  async fn open(&mut self, target: OpenTarget) -> Result<()> {
    let library = self.library.clone();
    let mut view: Box<dyn View> = match target {
      OpenTarget::Books(args) => Box::new(BookListView::new("Books", BookQuery::from(&args), library)),
      OpenTarget::Latest => Box::new(BookListView::latest(library)),
      OpenTarget::Summary => Box::new(BorrowSummaryView::new(library)),
      OpenTarget::Book { id } => Box::new(BookDetailView::new(id, library)),
    };

    view.settle().await;
    write!(
      self.out,
      "{}{}",
      header(&self.config.api.url, &view.breadcrumb_label()),
      view.render()
    )?;
    self.views.push(view);
    Ok(())
  }

  /// Re-render mounted views whose data changed since the last command.
  async fn refresh_views(&mut self) -> Result<()> {
    for view in self.views.iter_mut() {
      if view.tick() {
        view.settle().await;
        write!(
          self.out,
          "{}{}",
          header(&self.config.api.url, &view.breadcrumb_label()),
          view.render()
        )?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheLayer, MemoryStorage};
  use crate::library::client::LibraryClient;
  use crate::library::fake::FakeServer;
  use crate::library::transport::Method;
  use crate::library::Genre;
  use std::sync::{Arc, Mutex};

  #[derive(Clone, Default)]
  struct SharedBuf(Arc<Mutex<Vec<u8>>>);

  impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  impl SharedBuf {
    /// Output written since the last call
    fn take(&self) -> String {
      String::from_utf8(std::mem::take(&mut *self.0.lock().unwrap())).unwrap()
    }
  }

  const SUMMARY_HEADER: &str = "bookshelf | localhost:5000 | Borrow Summary";

  fn setup() -> (Arc<FakeServer>, App, SharedBuf) {
    let server = Arc::new(FakeServer::new());
    server.seed(NewBook {
      title: "Dune".to_string(),
      author: "Frank Herbert".to_string(),
      genre: Genre::Fiction,
      isbn: "111".to_string(),
      description: String::new(),
      copies: 3,
    });

    let library = CachedLibraryClient::with_parts(
      LibraryClient::new(server.clone()),
      CacheLayer::new(MemoryStorage::new()),
    );
    let out = SharedBuf::default();
    let app = App::with_client(library, Config::default(), Box::new(out.clone()));
    (server, app, out)
  }

  #[tokio::test]
  async fn test_list_prints_table() {
    let (_server, mut app, out) = setup();

    app.handle_line("ls").await.unwrap();
    let output = out.take();
    assert!(output.starts_with("ID"));
    assert!(output.contains("Dune"));
    assert!(output.contains("Frank Herbert"));
  }

  #[tokio::test]
  async fn test_unknown_command_gets_suggestions() {
    let (server, mut app, out) = setup();

    app.handle_line("sum").await.unwrap();
    assert_eq!(out.take(), "Unknown command 'sum'. Did you mean: summary?\n");

    app.handle_line("zzz").await.unwrap();
    assert!(out.take().contains("Type `help`"));
    assert!(server.requests().is_empty());
  }

  #[tokio::test]
  async fn test_usage_errors_keep_the_shell_running() {
    let (server, mut app, out) = setup();

    app.handle_line("add --title Dune").await.unwrap();
    assert!(out.take().contains("--author"));
    assert!(!app.should_quit());

    app.handle_line("show \"unterminated").await.unwrap();
    assert!(out.take().starts_with("Error: unclosed"));
    assert!(server.requests().is_empty());
  }

  #[tokio::test]
  async fn test_library_errors_are_printed() {
    let (_server, mut app, out) = setup();

    app.handle_line("show missing").await.unwrap();
    assert_eq!(out.take(), "Error: not found: Book not found\n");
  }

  #[tokio::test]
  async fn test_borrowing_too_many_sends_nothing() {
    let (server, mut app, out) = setup();

    app.handle_line("borrow book-1 --quantity 4").await.unwrap();
    assert!(out.take().starts_with("Error: invalid input: cannot borrow more than 3"));
    assert_eq!(server.count(Method::Post, "/api/borrow"), 0);
  }

  #[tokio::test]
  async fn test_borrow_shows_summary() {
    let (server, mut app, out) = setup();

    app
      .handle_line("borrow book-1 -q 2 --due 2026-11-01")
      .await
      .unwrap();
    let output = out.take();
    assert!(output.starts_with("Borrowed 2 of \"Dune\", due 2026-11-01."));
    assert!(output.contains(SUMMARY_HEADER));
    assert_eq!(server.book("book-1").unwrap().copies, 1);

    let summary_row = output.lines().last().unwrap();
    assert!(summary_row.starts_with("Dune"));
    assert!(summary_row.ends_with('2'));
  }

  #[tokio::test]
  async fn test_mounted_summary_refreshes_after_borrow() {
    let (server, mut app, out) = setup();

    app.handle_line("open summary").await.unwrap();
    let output = out.take();
    assert!(output.contains(SUMMARY_HEADER));
    assert!(output.contains("No books have been borrowed yet."));

    app.handle_line("borrow book-1 -q 2").await.unwrap();
    let output = out.take();
    // Once from the borrow itself, once from the mounted view
    assert_eq!(output.matches(SUMMARY_HEADER).count(), 2);
    assert!(!output.contains("No books have been borrowed yet."));
    // The view's refetch is served by the read the borrow just made
    assert_eq!(server.count(Method::Get, "/api/borrow"), 2);
  }

  #[tokio::test]
  async fn test_unrelated_commands_do_not_refresh_views() {
    let (_server, mut app, out) = setup();

    app.handle_line("open books").await.unwrap();
    out.take();

    app.handle_line("summary").await.unwrap();
    let output = out.take();
    assert!(!output.contains("bookshelf | localhost:5000 | Books"));
  }

  #[tokio::test]
  async fn test_mounted_list_shows_added_book() {
    let (_server, mut app, out) = setup();

    app.handle_line("open books --sort-by title").await.unwrap();
    out.take();

    app
      .handle_line("add --title Emma --author Austen --genre fiction --isbn 222 --copies 1")
      .await
      .unwrap();
    let output = out.take();
    assert!(output.starts_with("Added \"Emma\" (book-2)."));
    assert!(output.contains("bookshelf | localhost:5000 | Books (2)"));
  }

  #[tokio::test]
  async fn test_mounted_book_reports_deletion() {
    let (_server, mut app, out) = setup();

    app.handle_line("open book book-1").await.unwrap();
    assert!(out.take().contains("Title:       Dune"));

    app.handle_line("delete book-1 --yes").await.unwrap();
    let output = out.take();
    assert!(output.starts_with("Deleted book book-1."));
    assert!(output.contains("Error: not found: Book not found"));
  }

  #[tokio::test]
  async fn test_delete_asks_for_confirmation() {
    let (server, mut app, out) = setup();

    app.handle_line("rm book-1").await.unwrap();
    assert_eq!(out.take(), "Delete \"Dune\" (book-1)? [y/N] ");
    assert!(app.awaiting_confirmation());

    app.handle_line("n").await.unwrap();
    assert_eq!(out.take(), "Cancelled.\n");
    assert!(server.book("book-1").is_some());

    app.handle_line("delete book-1").await.unwrap();
    app.handle_line("yes").await.unwrap();
    assert!(out.take().ends_with("Deleted \"Dune\".\n"));
    assert!(server.book("book-1").is_none());
    assert!(!app.awaiting_confirmation());
  }

  #[tokio::test]
  async fn test_edit_prints_updated_book() {
    let (server, mut app, out) = setup();

    app
      .handle_line("edit book-1 --title 'Dune Messiah'")
      .await
      .unwrap();
    let output = out.take();
    assert!(output.starts_with("Updated \"Dune Messiah\"."));
    assert!(output.contains("Author:      Frank Herbert"));
    assert_eq!(server.book("book-1").unwrap().title, "Dune Messiah");
  }

  #[tokio::test]
  async fn test_close_unmounts_views() {
    let (_server, mut app, out) = setup();

    app.handle_line("open latest").await.unwrap();
    app.handle_line("open summary").await.unwrap();
    out.take();

    app.handle_line("close").await.unwrap();
    assert_eq!(out.take(), "Closed 2 view(s).\n");

    app.handle_line("borrow book-1").await.unwrap();
    assert_eq!(out.take().matches(SUMMARY_HEADER).count(), 1);
  }

  #[tokio::test]
  async fn test_run_once_reads_confirmation() {
    let (server, mut app, out) = setup();

    app
      .run_once(
        Action::Delete {
          id: "book-1".to_string(),
          yes: false,
        },
        || EventHandler::from_reader(std::io::Cursor::new(b"y\n".to_vec())),
      )
      .await
      .unwrap();
    assert!(out.take().ends_with("Deleted \"Dune\".\n"));
    assert!(server.book("book-1").is_none());
  }

  #[tokio::test]
  async fn test_run_once_propagates_errors() {
    let (_server, mut app, _out) = setup();

    let err = app
      .run_once(Action::Show { id: "nope".to_string() }, || {
        panic!("no confirmation expected")
      })
      .await
      .unwrap_err();
    assert!(err.to_string().contains("not found"));
  }

  #[tokio::test]
  async fn test_shell_runs_until_quit() {
    let (_server, mut app, out) = setup();
    let mut events = EventHandler::from_reader(std::io::Cursor::new(b"help\nquit\nlist\n".to_vec()));

    app.run_shell(&mut events).await.unwrap();
    assert!(app.should_quit());
    let output = out.take();
    assert!(output.contains("Usage:"));
    // Nothing after quit is executed
    assert!(!output.contains("Frank Herbert"));
  }
}
