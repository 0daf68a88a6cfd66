//! HTTP transport abstraction.
//!
//! The client speaks to the service through the [`Transport`] trait so the
//! cache and envelope logic can run against an in-memory server in tests.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::config::ApiConfig;

use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    })
  }
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// A request against the service, relative to the configured base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Path segments, unescaped (e.g. `["api", "books", id]`)
  pub segments: Vec<String>,
  pub query: Vec<(&'static str, String)>,
  pub body: Option<Value>,
}

impl ApiRequest {
  pub fn new(method: Method, segments: &[&str]) -> Self {
    Self {
      method,
      segments: segments.iter().map(|s| s.to_string()).collect(),
      query: Vec::new(),
      body: None,
    }
  }

  pub fn get(segments: &[&str]) -> Self {
    Self::new(Method::Get, segments)
  }

  pub fn post(segments: &[&str], body: Value) -> Self {
    Self::new(Method::Post, segments).with_body(body)
  }

  pub fn put(segments: &[&str], body: Value) -> Self {
    Self::new(Method::Put, segments).with_body(body)
  }

  pub fn delete(segments: &[&str]) -> Self {
    Self::new(Method::Delete, segments)
  }

  pub fn with_query(mut self, query: Vec<(&'static str, String)>) -> Self {
    self.query = query;
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  /// `/api/books/42`
  pub fn path(&self) -> String {
    format!("/{}", self.segments.join("/"))
  }

  /// Method, path and query string; identical reads share a signature.
  pub fn signature(&self) -> String {
    let mut signature = format!("{} {}", self.method, self.path());
    if !self.query.is_empty() {
      let query: Vec<String> = self
        .query
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
      signature.push('?');
      signature.push_str(&query.join("&"));
    }
    signature
  }
}

/// Raw response: status and body bytes
#[derive(Debug, Clone)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl ApiResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  /// Send a request. Only transport failures are errors; non-2xx responses
  /// are returned as-is.
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let mut base_url = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid API url '{}': {}", config.url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("API url '{}' cannot be used as a base", config.url));
    }
    // Url::join and path_segments_mut treat a trailing slash as a directory
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::Network(format!("invalid base url {}", self.base_url)))?
      .pop_if_empty()
      .extend(&request.segments);
    if !request.query.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(request.query.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
    let url = self.url_for(&request)?;
    let mut builder = self.client.request(request.method.into(), url);
    if let Some(body) = &request.body {
      let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Decode(e.to_string()))?;
      builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
      .bytes()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;

    Ok(ApiResponse {
      status,
      body: body.to_vec(),
    })
  }
}
