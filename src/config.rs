use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub borrow: BorrowConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the library service; `/api/...` paths are appended to it
  #[serde(default = "default_api_url")]
  pub url: String,
  /// Per-request timeout. Requests wait indefinitely when unset.
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: None,
    }
  }
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Keep reads in memory between calls. Concurrent identical reads are
  /// shared either way.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Maximum age of a cached read before it is fetched again
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_secs: default_stale_secs(),
    }
  }
}

impl CacheConfig {
  /// `stale_secs` as a duration. Fails for values chrono cannot represent.
  pub fn stale_time(&self) -> Result<chrono::Duration> {
    i64::try_from(self.stale_secs)
      .ok()
      .and_then(chrono::Duration::try_seconds)
      .ok_or_else(|| eyre!("cache.stale_secs is out of range: {}", self.stale_secs))
  }
}

fn default_true() -> bool {
  true
}

fn default_stale_secs() -> u64 {
  60
}

#[derive(Debug, Clone, Deserialize)]
pub struct BorrowConfig {
  /// Due date offset used when a borrow does not name one
  #[serde(default = "default_due_in_days")]
  pub due_in_days: u32,
}

impl Default for BorrowConfig {
  fn default() -> Self {
    Self {
      due_in_days: default_due_in_days(),
    }
  }
}

fn default_due_in_days() -> u32 {
  7
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
  /// `tracing` filter directive, e.g. "bookshelf=debug"
  pub level: Option<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./bookshelf.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/bookshelf/config.yaml
  ///
  /// Defaults apply when no file exists. Environment overrides are applied
  /// last.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.apply_env(|name| std::env::var(name).ok());
    config.cache.stale_time()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("bookshelf.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("bookshelf").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Apply `BOOKSHELF_API_URL` and `BOOKSHELF_LOG`.
  fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
    if let Some(url) = var("BOOKSHELF_API_URL").filter(|v| !v.trim().is_empty()) {
      self.api.url = url;
    }
    if let Some(level) = var("BOOKSHELF_LOG").filter(|v| !v.trim().is_empty()) {
      self.log.level = Some(level);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults_without_file() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert_eq!(config.api.timeout_secs, None);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.stale_secs, 60);
    assert_eq!(config.borrow.due_in_days, 7);
    assert!(config.log.file.is_none());
  }

  #[test]
  fn test_partial_file_keeps_other_defaults() {
    let config = Config::parse("api:\n  url: http://library.test:8080\ncache:\n  stale_secs: 5\n").unwrap();
    assert_eq!(config.api.url, "http://library.test:8080");
    assert_eq!(config.cache.stale_secs, 5);
    assert!(config.cache.enabled);
    assert_eq!(config.borrow.due_in_days, 7);
  }

  #[test]
  fn test_load_from_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
      file,
      "api:\n  url: http://books.local\n  timeout_secs: 3\nborrow:\n  due_in_days: 14\nlog:\n  file: /tmp/bookshelf.log\n  level: debug"
    )
    .unwrap();

    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.api.url, "http://books.local");
    assert_eq!(config.api.timeout_secs, Some(3));
    assert_eq!(config.borrow.due_in_days, 14);
    assert_eq!(config.log.file, Some(PathBuf::from("/tmp/bookshelf.log")));
    assert_eq!(config.log.level.as_deref(), Some("debug"));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    let err = Config::load(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_invalid_yaml_names_the_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api: [not, a, map").unwrap();
    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
  }

  #[test]
  fn test_stale_time_range() {
    let config = Config::parse("cache:\n  stale_secs: 90\n").unwrap();
    assert_eq!(config.cache.stale_time().unwrap(), chrono::Duration::seconds(90));

    for secs in [10_000_000_000_000_000, u64::MAX] {
      let cache = CacheConfig {
        enabled: true,
        stale_secs: secs,
      };
      let err = cache.stale_time().unwrap_err();
      assert!(err.to_string().contains("cache.stale_secs"), "{}", err);
    }
  }

  #[test]
  fn test_out_of_range_stale_secs_fails_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "cache:\n  stale_secs: {}", u64::MAX).unwrap();
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("cache.stale_secs"));
  }

  #[test]
  fn test_env_overrides() {
    let mut config = Config::default();
    config.apply_env(|name| match name {
      "BOOKSHELF_API_URL" => Some("http://override:9000".to_string()),
      "BOOKSHELF_LOG" => Some("trace".to_string()),
      _ => None,
    });
    assert_eq!(config.api.url, "http://override:9000");
    assert_eq!(config.log.level.as_deref(), Some("trace"));
  }

  #[test]
  fn test_blank_env_values_are_ignored() {
    let mut config = Config::default();
    config.apply_env(|_| Some("  ".to_string()));
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert!(config.log.level.is_none());
  }
}
