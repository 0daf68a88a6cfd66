use ratatui::text::Line;

use crate::library::Book;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display width in terminal columns
pub fn width(s: &str) -> usize {
  Line::from(s).width()
}

/// "Yes" or "No" as shown in book tables
pub fn availability(book: &Book) -> &'static str {
  if book.available {
    "Yes"
  } else {
    "No"
  }
}
