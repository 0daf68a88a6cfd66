use crossterm::event::{self, Event as CrosstermEvent, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::tty::IsTty;
use crossterm::{cursor, queue};
use std::io::{self, BufRead, Write};
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::ui::components::{InputResult, TextInput};

/// Shell events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// One line of input, without the line terminator
  Input(String),
  /// Input closed
  Eof,
}

/// Event handler that produces one line of input per request.
///
/// Lines are read on a dedicated thread, so a blocked read never holds up
/// the runtime or process exit.
pub struct EventHandler {
  requests: std_mpsc::Sender<()>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Edit lines in the terminal when stdin is one, otherwise read lines
  /// from the pipe
  pub fn stdin() -> Self {
    if io::stdin().is_tty() {
      Self::terminal()
    } else {
      Self::from_reader(io::BufReader::new(io::stdin()))
    }
  }

  /// Read key events through crossterm and edit each line in raw mode
  pub fn terminal() -> Self {
    Self::spawn(read_terminal_line)
  }

  pub fn from_reader<R>(reader: R) -> Self
  where
    R: BufRead + Send + 'static,
  {
    let mut lines = reader.lines();
    Self::spawn(move || lines.next().transpose())
  }

  fn spawn<F>(mut read_line: F) -> Self
  where
    F: FnMut() -> io::Result<Option<String>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    let (requests, pending) = std_mpsc::channel();

    std::thread::spawn(move || {
      while pending.recv().is_ok() {
        let event = match read_line() {
          Ok(Some(line)) => Event::Input(line),
          Ok(None) => Event::Eof,
          Err(e) => {
            warn!(error = %e, "failed to read input");
            Event::Eof
          }
        };
        let closed = event == Event::Eof;
        if tx.send(event).is_err() || closed {
          return;
        }
      }
    });

    Self { requests, rx }
  }

  /// Read the next line. Returns `None` once input has ended.
  pub async fn next(&mut self) -> Option<Event> {
    // The reader is gone after Eof; recv then reports the closed channel
    let _ = self.requests.send(());
    self.rx.recv().await
  }
}

fn read_terminal_line() -> io::Result<Option<String>> {
  terminal::enable_raw_mode()?;
  let line = edit_line(&mut io::stdout());
  terminal::disable_raw_mode()?;
  line
}

/// Edit one line after whatever prompt is already on screen
fn edit_line(out: &mut impl Write) -> io::Result<Option<String>> {
  let (start, _) = cursor::position()?;
  let mut input = TextInput::new();

  loop {
    let CrosstermEvent::Key(key) = event::read()? else {
      continue;
    };
    if key.kind != KeyEventKind::Press {
      continue;
    }

    match input.handle_key(key) {
      InputResult::Submitted(line) => {
        queue!(out, Print("\r\n"))?;
        out.flush()?;
        return Ok(Some(line));
      }
      InputResult::Closed => {
        queue!(out, Print("\r\n"))?;
        out.flush()?;
        return Ok(None);
      }
      InputResult::Consumed | InputResult::Cancelled | InputResult::NotHandled => {}
    }

    let column = u16::try_from(input.cursor_width())
      .unwrap_or(u16::MAX)
      .saturating_add(start);
    queue!(
      out,
      cursor::MoveToColumn(start),
      Clear(ClearType::UntilNewLine),
      Print(input.value()),
      cursor::MoveToColumn(column)
    )?;
    out.flush()?;
  }
}
