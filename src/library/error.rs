use thiserror::Error;

/// Errors returned by the library service client.
///
/// Cloneable so that one failed request can be handed to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
  /// Transport failure, no response was received
  #[error("network error: {0}")]
  Network(String),

  /// Non-2xx response
  #[error("server error {status}{}", describe_message(.message))]
  Server {
    status: u16,
    message: Option<String>,
  },

  /// The requested resource does not exist
  #[error("{}", describe_not_found(.path, .message))]
  NotFound {
    path: String,
    message: Option<String>,
  },

  /// Rejected on the client before any request was sent
  #[error("invalid input: {0}")]
  Validation(String),

  /// A 2xx response whose body did not have the expected shape
  #[error("unexpected response: {0}")]
  Decode(String),
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    ApiError::Decode(err.to_string())
  }
}

fn describe_message(message: &Option<String>) -> String {
  match message {
    Some(m) => format!(": {}", m),
    None => String::new(),
  }
}

fn describe_not_found(path: &str, message: &Option<String>) -> String {
  match message {
    Some(m) => format!("not found: {}", m),
    None => format!("not found: {}", path),
  }
}
