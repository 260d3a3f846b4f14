//! HTTP transport for vision provider requests.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

use crate::confluence::client::user_agent;

/// A fully shaped provider call: where to send it, the extra headers, and
/// the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Value,
}

impl ProviderRequest {
  pub fn new(url: impl Into<String>, body: Value) -> Self {
    Self {
      url: url.into(),
      headers: Vec::new(),
      body,
    }
  }

  pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.push((name.to_string(), value.into()));
    self
  }

  /// Add `Authorization: Bearer <key>` when a key is present.
  pub fn bearer(self, api_key: Option<&str>) -> Self {
    match api_key {
      Some(key) => self.header("Authorization", format!("Bearer {key}")),
      None => self,
    }
  }

  pub fn header_value(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }
}

/// Sends provider requests. Abstracted so tests can observe whether a call
/// was attempted at all.
#[async_trait]
pub trait VisionTransport: Send + Sync {
  /// POST the request body as JSON and parse the JSON answer.
  async fn post_json(&self, request: ProviderRequest) -> Result<Value>;
}

/// `reqwest`-backed transport used outside tests.
#[derive(Clone)]
pub struct HttpVisionClient {
  client: reqwest::Client,
}

impl HttpVisionClient {
  /// # Errors
  /// Returns an error if the underlying `reqwest::Client` cannot be built.
  pub fn new(timeout_secs: u64) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .user_agent(user_agent())
      .build()
      .context("Failed to create HTTP client for vision requests")?;
    Ok(Self { client })
  }
}

#[async_trait]
impl VisionTransport for HttpVisionClient {
  async fn post_json(&self, request: ProviderRequest) -> Result<Value> {
    debug!(url = %redact_query(&request.url), "POST (vision)");

    let mut builder = self
      .client
      .post(&request.url)
      .header(ACCEPT, "application/json")
      .json(&request.body);
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    // reqwest errors embed the full URL, which may carry the Google key.
    let response = builder
      .send()
      .await
      .map_err(reqwest::Error::without_url)
      .with_context(|| format!("Failed to send vision request to {}", redact_query(&request.url)))?;

    let status = response.status();
    if !status.is_success() {
      let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("(no error details)"));
      return Err(anyhow!("HTTP {status}: {error_text}"));
    }

    response
      .json()
      .await
      .map_err(reqwest::Error::without_url)
      .context("Failed to parse vision API response")
  }
}

// Google carries the API key in the query string.
fn redact_query(url: &str) -> &str {
  url.split_once('?').map_or(url, |(path, _)| path)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_bearer_header_is_optional() {
    let request = ProviderRequest::new("https://vision.local", json!({})).bearer(None);
    assert!(request.headers.is_empty());

    let request = ProviderRequest::new("https://vision.local", json!({})).bearer(Some("k"));
    assert_eq!(request.header_value("authorization"), Some("Bearer k"));
  }

  #[test]
  fn test_redact_query() {
    assert_eq!(
      redact_query("https://generativelanguage.googleapis.com/v1beta/models/m:generateContent?key=secret"),
      "https://generativelanguage.googleapis.com/v1beta/models/m:generateContent"
    );
    assert_eq!(redact_query("https://vision.local/describe"), "https://vision.local/describe");
  }

  #[test]
  fn test_http_client_builds() {
    assert!(HttpVisionClient::new(30).is_ok());
  }

  #[tokio::test]
  async fn test_send_failure_does_not_leak_query_key() {
    let client = HttpVisionClient::new(5).unwrap();
    let request = ProviderRequest::new(
      "http://127.0.0.1:9/v1beta/models/m:generateContent?key=SECRET123",
      json!({}),
    );

    let err = client.post_json(request).await.unwrap_err();

    let rendered = format!("{err:#}");
    assert!(rendered.contains("127.0.0.1:9/v1beta/models/m:generateContent"));
    assert!(!rendered.contains("SECRET123"), "{rendered}");
  }
}
