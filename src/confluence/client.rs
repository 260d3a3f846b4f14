//! HTTP client implementation for talking to the Confluence REST API.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use super::api::{BinaryBody, ConfluenceApi, Endpoint};
use crate::credentials::{Credential, SUBSCRIPTION_KEY_HEADER};

/// Confluence API client.
#[derive(Clone)]
pub struct ConfluenceClient {
  base_url: Url,
  credential: Credential,
  client: reqwest::Client,
  rate_limiter: Arc<RequestRateLimiter>,
}

/// Fixed-window rate limiter capping the number of requests per interval.
#[derive(Debug)]
struct RequestRateLimiter {
  max_requests: usize,
  window: Duration,
  timestamps: Mutex<VecDeque<Instant>>,
}

impl RequestRateLimiter {
  fn new(max_requests: usize, window: Duration) -> Self {
    Self {
      max_requests,
      window,
      timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
    }
  }

  /// Wait until another request fits into the current window, then reserve
  /// a slot for it.
  async fn acquire(&self) {
    loop {
      let mut timestamps = self.timestamps.lock().await;
      let now = Instant::now();

      while let Some(earliest) = timestamps.front()
        && now.duration_since(*earliest) >= self.window
      {
        timestamps.pop_front();
      }

      let Some(earliest) = timestamps.front().copied().filter(|_| timestamps.len() >= self.max_requests) else {
        timestamps.push_back(now);
        return;
      };

      let wait = self.window.saturating_sub(now.duration_since(earliest));
      drop(timestamps);

      if !wait.is_zero() {
        sleep(wait).await;
      }
    }
  }
}

impl ConfluenceClient {
  /// Create a new Confluence client.
  ///
  /// # Arguments
  /// * `base_url` - Base URL of the Confluence instance (e.g., https://wiki.example.com)
  /// * `credential` - Basic auth and gateway credentials
  /// * `timeout_secs` - Request timeout in seconds
  /// * `rate_limit` - Maximum requests per second
  ///
  /// # Errors
  /// Returns an error if the rate limit is zero, the base URL is invalid, or
  /// the underlying `reqwest::Client` cannot be built.
  pub fn new(base_url: &str, credential: Credential, timeout_secs: u64, rate_limit: usize) -> Result<Self> {
    if rate_limit == 0 {
      return Err(anyhow!("Rate limit must be at least 1 request per second"));
    }

    let base_url = Url::parse(base_url.trim_end_matches('/'))
      .with_context(|| format!("Invalid Confluence base URL: {base_url}"))?;
    if base_url.cannot_be_a_base() {
      return Err(anyhow!("Confluence base URL cannot carry a path: {base_url}"));
    }

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .user_agent(user_agent())
      .build()
      .context("Failed to create HTTP client")?;

    Ok(Self {
      base_url,
      credential,
      client,
      rate_limiter: Arc::new(RequestRateLimiter::new(rate_limit, Duration::from_secs(1))),
    })
  }

  /// Get the authorization header value (Basic auth), if a username is set.
  fn auth_header(&self) -> Option<String> {
    if !self.credential.has_basic_auth() {
      return None;
    }
    let username = self.credential.username.as_deref().unwrap_or_default();
    let password = self.credential.password.as_deref().unwrap_or_default();
    let credentials = format!("{username}:{password}");
    Some(format!("Basic {}", BASE64.encode(credentials.as_bytes())))
  }

  fn authenticated(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    let mut request = request;
    if let Some(header) = self.auth_header() {
      request = request.header(AUTHORIZATION, header);
    }
    if let Some(key) = &self.credential.subscription_key {
      request = request.header(SUBSCRIPTION_KEY_HEADER, key);
    }
    request
  }

  fn endpoint_url(&self, endpoint: &Endpoint) -> Result<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| anyhow!("Confluence base URL cannot carry a path: {}", self.base_url))?
      .pop_if_empty()
      .extend(endpoint.segments());
    Ok(url)
  }

  fn resolve_download_url(&self, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
      return location.to_string();
    }

    let base = self.base_url.as_str().trim_end_matches('/');
    if location.starts_with('/') {
      format!("{base}{location}")
    } else {
      format!("{base}/{location}")
    }
  }
}

#[async_trait]
impl ConfluenceApi for ConfluenceClient {
  async fn get_json(&self, endpoint: &Endpoint, query: &[(String, String)]) -> Result<Value> {
    let url = self.endpoint_url(endpoint)?;
    self.rate_limiter.acquire().await;
    debug!(%url, ?query, "GET");

    let response = self
      .authenticated(self.client.get(url.clone()))
      .header(ACCEPT, "application/json")
      .query(query)
      .send()
      .await
      .with_context(|| format!("Failed to send request to {url}"))?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("(no error details)"));
      return Err(anyhow!("Confluence API returned error {status} for {endpoint}: {error_text}"));
    }

    response
      .json()
      .await
      .with_context(|| format!("Failed to parse JSON response from {endpoint}"))
  }

  async fn get_binary(&self, location: &str) -> Result<BinaryBody> {
    let full_url = self.resolve_download_url(location);
    self.rate_limiter.acquire().await;
    debug!(url = %full_url, "GET (binary)");

    let response = self
      .authenticated(self.client.get(&full_url))
      .header(ACCEPT, "image/*")
      .send()
      .await
      .with_context(|| format!("Failed to download {full_url}"))?;

    let status = response.status();
    if !status.is_success() {
      let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("(no error details)"));
      return Err(anyhow!("Failed to fetch {full_url}: {status} - {error_text}"));
    }

    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|value| value.to_str().ok())
      .map(str::to_string);
    let bytes = response.bytes().await.context("Failed to read response bytes")?;

    Ok(BinaryBody {
      content_type,
      bytes: bytes.to_vec(),
    })
  }
}

/// User agent sent with every request.
pub(crate) fn user_agent() -> String {
  format!("confluence-ingest/{} ({})", env!("CARGO_PKG_VERSION"), env!("TARGET"))
}
