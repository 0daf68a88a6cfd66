use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

const DEFAULT_FILTER: &str = "bookshelf=warn";

/// Install the global subscriber. Logs go to stderr, or to `log.file` through
/// a non-blocking writer whose guard must be kept alive until exit.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = filter_for(config.level.as_deref())?;

  match &config.file {
    Some(path) => {
      let (writer, guard) = file_writer(path)?;
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(None)
    }
  }
}

fn filter_for(level: Option<&str>) -> Result<EnvFilter> {
  let directive = level.unwrap_or(DEFAULT_FILTER);
  EnvFilter::try_new(directive).map_err(|e| eyre!("Invalid log filter '{}': {}", directive, e))
}

fn file_writer(
  path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
  let file_name = path
    .file_name()
    .ok_or_else(|| eyre!("Log path {} has no file name", path.display()))?;
  let dir = match path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() => dir,
    _ => Path::new("."),
  };
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(dir, file_name);
  Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_filter_is_valid() {
    assert!(filter_for(None).is_ok());
    assert!(filter_for(Some("bookshelf=debug,reqwest=info")).is_ok());
  }

  #[test]
  fn test_invalid_filter_is_reported() {
    let err = filter_for(Some("bookshelf=notalevel")).unwrap_err();
    assert!(err.to_string().contains("Invalid log filter"));
  }

  #[test]
  fn test_file_writer_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("bookshelf.log");
    let (_writer, _guard) = file_writer(&path).unwrap();
    assert!(dir.path().join("logs").is_dir());
  }

  #[test]
  fn test_file_writer_rejects_directory_path() {
    assert!(file_writer(Path::new("/")).is_err());
  }
}
