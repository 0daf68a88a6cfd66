//! Command-line and shell grammar.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::library::{BookPatch, BookQuery, Genre, NewBook, SortField, SortOrder};

/// Library operations, available both as subcommands and in the shell
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
  /// List books
  List(ListArgs),
  /// Show the six most recently added books
  Latest,
  /// Show every field of one book
  Show { id: String },
  /// Add a book
  Add(AddArgs),
  /// Change some fields of a book
  Edit(EditArgs),
  /// Delete a book
  Delete {
    id: String,
    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
  },
  /// Borrow copies of a book, then show the borrow summary
  Borrow {
    id: String,
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,
    /// Due date (YYYY-MM-DD); defaults to `borrow.due_in_days` from today
    #[arg(short, long)]
    due: Option<NaiveDate>,
  },
  /// Total borrowed quantity per book
  Summary,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ListArgs {
  /// Only books of this genre, e.g. FICTION or non-fiction
  #[arg(short, long)]
  pub genre: Option<Genre>,
  /// title, author, genre, copies, createdAt or updatedAt
  #[arg(long)]
  pub sort_by: Option<SortField>,
  /// asc or desc
  #[arg(long)]
  pub sort: Option<SortOrder>,
  #[arg(short, long)]
  pub limit: Option<u32>,
}

impl From<&ListArgs> for BookQuery {
  fn from(args: &ListArgs) -> Self {
    BookQuery {
      genre: args.genre,
      sort_by: args.sort_by,
      sort: args.sort,
      limit: args.limit,
    }
  }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct AddArgs {
  #[arg(long)]
  pub title: String,
  #[arg(long)]
  pub author: String,
  #[arg(long)]
  pub genre: Genre,
  #[arg(long)]
  pub isbn: String,
  #[arg(long, default_value = "")]
  pub description: String,
  #[arg(long)]
  pub copies: u32,
}

impl From<AddArgs> for NewBook {
  fn from(args: AddArgs) -> Self {
    NewBook {
      title: args.title,
      author: args.author,
      genre: args.genre,
      isbn: args.isbn,
      description: args.description,
      copies: args.copies,
    }
  }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct EditArgs {
  pub id: String,
  #[arg(long)]
  pub title: Option<String>,
  #[arg(long)]
  pub author: Option<String>,
  #[arg(long)]
  pub genre: Option<Genre>,
  #[arg(long)]
  pub isbn: Option<String>,
  #[arg(long)]
  pub description: Option<String>,
  #[arg(long)]
  pub copies: Option<u32>,
}

impl EditArgs {
  pub fn patch(&self) -> BookPatch {
    BookPatch {
      title: self.title.clone(),
      author: self.author.clone(),
      genre: self.genre,
      isbn: self.isbn.clone(),
      description: self.description.clone(),
      copies: self.copies,
    }
  }
}

/// One line typed into the shell
#[derive(Parser, Debug)]
#[command(multicall = true, disable_help_subcommand = true)]
pub struct ShellLine {
  #[command(subcommand)]
  pub command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ShellCommand {
  #[command(flatten)]
  Action(Action),
  /// Keep a view on screen, refreshed after every change
  Open {
    #[command(subcommand)]
    target: OpenTarget,
  },
  /// Close all open views
  Close,
  /// Show the command reference
  Help,
  /// Exit the shell
  Quit,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum OpenTarget {
  /// Books matching the list options
  Books(ListArgs),
  Latest,
  Summary,
  Book { id: String },
}
