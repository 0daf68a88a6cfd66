use crate::library::{Book, BorrowSummaryEntry};

use super::table::Table;
use super::utils::availability;

pub fn book_table(books: &[Book]) -> String {
  if books.is_empty() {
    return "No books found. Add one with `add`.\n".to_string();
  }

  let mut table = Table::new(vec![
    "ID", "Title", "Author", "Genre", "ISBN", "Copies", "Available",
  ]);
  for book in books {
    table.row(vec![
      book.id.clone(),
      book.title.clone(),
      book.author.clone(),
      book.genre.label().to_string(),
      book.isbn.clone(),
      book.copies.to_string(),
      availability(book).to_string(),
    ]);
  }
  table.render()
}

/// Every field of one book, one per line
pub fn book_detail(book: &Book) -> String {
  let mut lines = vec![
    format!("Title:       {}", book.title),
    format!("Author:      {}", book.author),
    format!("Genre:       {}", book.genre.label()),
    format!("ISBN:        {}", book.isbn),
    format!("Copies:      {}", book.copies),
    format!("Available:   {}", availability(book)),
    format!("ID:          {}", book.id),
  ];
  if let Some(created) = book.created_at {
    lines.push(format!("Added:       {}", created.format("%Y-%m-%d %H:%M")));
  }
  if let Some(updated) = book.updated_at {
    lines.push(format!("Updated:     {}", updated.format("%Y-%m-%d %H:%M")));
  }
  if !book.description.trim().is_empty() {
    lines.push(String::new());
    lines.push(book.description.trim().to_string());
  }

  let mut out = lines.join("\n");
  out.push('\n');
  out
}

pub fn summary_table(entries: &[BorrowSummaryEntry]) -> String {
  if entries.is_empty() {
    return "No books have been borrowed yet.\n".to_string();
  }

  let mut table = Table::new(vec!["Title", "ISBN", "Total Quantity"]);
  for entry in entries {
    table.row(vec![
      entry.title.clone(),
      entry.isbn.clone(),
      entry.total_quantity.to_string(),
    ]);
  }
  table.render()
}
