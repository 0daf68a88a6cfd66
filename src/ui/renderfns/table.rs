use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Rect};
use ratatui::widgets::{Row, Table as TableWidget, Widget};

use super::utils::{truncate, width};

const COLUMN_SPACING: u16 = 2;

/// Column-aligned table, laid out with ratatui and printed as plain text
#[derive(Debug, Clone)]
pub struct Table {
  headers: Vec<&'static str>,
  rows: Vec<Vec<String>>,
  max_width: usize,
}

impl Table {
  pub fn new(headers: Vec<&'static str>) -> Self {
    Self {
      headers,
      rows: Vec::new(),
      max_width: 40,
    }
  }

  /// Cells wider than this are truncated
  pub fn with_max_width(mut self, max_width: usize) -> Self {
    self.max_width = max_width;
    self
  }

  pub fn row(&mut self, cells: Vec<String>) {
    self.rows.push(cells);
  }

  pub fn render(&self) -> String {
    let rows: Vec<Vec<String>> = self
      .rows
      .iter()
      .map(|row| row.iter().map(|c| truncate(c, self.max_width)).collect())
      .collect();

    let mut widths: Vec<u16> = self.headers.iter().map(|h| to_u16(width(h))).collect();
    for row in &rows {
      for (i, cell) in row.iter().enumerate() {
        if let Some(w) = widths.get_mut(i) {
          *w = (*w).max(to_u16(width(cell)));
        }
      }
    }

    // Header, a dashed rule, then the rows
    let rule = Row::new(widths.iter().map(|w| "-".repeat(usize::from(*w))));
    let body = std::iter::once(rule).chain(rows.into_iter().map(Row::new));
    let table = TableWidget::new(body, widths.iter().map(|w| Constraint::Length(*w)))
      .header(Row::new(self.headers.iter().copied()))
      .column_spacing(COLUMN_SPACING);

    let gaps = to_u16(widths.len().saturating_sub(1)).saturating_mul(COLUMN_SPACING);
    let total_width = widths.iter().fold(gaps, |sum, w| sum.saturating_add(*w));
    let height = to_u16(self.rows.len()).saturating_add(2);
    let area = Rect::new(0, 0, total_width, height);

    let mut buf = Buffer::empty(area);
    table.render(area, &mut buf);
    buffer_text(&buf)
  }
}

fn to_u16(n: usize) -> u16 {
  u16::try_from(n).unwrap_or(u16::MAX)
}

/// The buffer's symbols, one line per row, trailing blanks removed
fn buffer_text(buf: &Buffer) -> String {
  let area = buf.area;
  let mut out = String::new();
  for y in area.top()..area.bottom() {
    let mut line = String::new();
    // Cells covered by a wide character are skipped
    let mut covered = 0;
    for x in area.left()..area.right() {
      if covered > 0 {
        covered -= 1;
        continue;
      }
      let symbol = buf[(x, y)].symbol();
      covered = width(symbol).saturating_sub(1);
      line.push_str(symbol);
    }
    out.push_str(line.trim_end());
    out.push('\n');
  }
  out
}
