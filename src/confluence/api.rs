//! Trait definitions for talking to Confluence.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A REST path below the Confluence base URL, kept as unencoded segments so
/// that keys and identifiers are percent-encoded exactly once by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
  segments: Vec<String>,
}

impl Endpoint {
  /// Start an endpoint below `/rest/api`.
  pub fn rest_api() -> Self {
    Self {
      segments: vec!["rest".to_string(), "api".to_string()],
    }
  }

  /// Append one path segment.
  pub fn join(mut self, segment: impl Into<String>) -> Self {
    self.segments.push(segment.into());
    self
  }

  pub fn segments(&self) -> &[String] {
    &self.segments
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for segment in &self.segments {
      write!(f, "/{segment}")?;
    }
    Ok(())
  }
}

/// Raw bytes returned by a binary download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryBody {
  /// `Content-Type` reported by the server, when present.
  pub content_type: Option<String>,
  pub bytes: Vec<u8>,
}

/// Authenticated access to the Confluence REST API (enables testing with
/// fake implementations).
#[async_trait]
pub trait ConfluenceApi: Send + Sync {
  /// Issue an authenticated `GET` expecting a JSON document.
  ///
  /// # Arguments
  /// * `endpoint` - REST path below the base URL.
  /// * `query` - Query parameters appended to the request.
  ///
  /// # Returns
  /// The untyped response body; callers validate it against a schema.
  async fn get_json(&self, endpoint: &Endpoint, query: &[(String, String)]) -> Result<Value>;

  /// Issue an authenticated `GET` for raw bytes with an image `Accept`
  /// header.
  ///
  /// # Arguments
  /// * `location` - Download path relative to the base URL, or an absolute
  ///   URL.
  async fn get_binary(&self, location: &str) -> Result<BinaryBody>;
}
