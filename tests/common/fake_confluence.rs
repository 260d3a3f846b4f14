//! Fake Confluence API client for testing
//!
//! Serves listing endpoints by slicing a full result list with the `start`
//! and `limit` query parameters, the same way the real server pages, so the
//! number of listing requests a run makes is observable. Every request is
//! recorded.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use confluence_ingest::confluence::{BinaryBody, ConfluenceApi, Endpoint};
use serde_json::{Value, json};

/// How a listing wraps its results.
#[derive(Debug, Clone, Copy)]
enum Envelope {
  /// `{"results": [...]}`
  Flat,
  /// `{"page": {"results": [...]}}` as returned by the space content listing.
  GroupedPages,
}

#[derive(Debug, Clone)]
enum Listing {
  Paged { envelope: Envelope, results: Vec<Value> },
  Raw(Value),
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
  Json { path: String, start: usize, limit: usize },
  Binary { location: String },
}

/// A fake Confluence client that returns predefined responses for testing
#[derive(Default)]
pub struct FakeConfluence {
  listings: HashMap<String, Listing>,
  binaries: HashMap<String, BinaryBody>,
  requests: Mutex<Vec<Request>>,
}

impl FakeConfluence {
  pub fn new() -> Self {
    Self::default()
  }

  /// Serve `results` as the content listing of a space.
  pub fn with_space_content(mut self, space_key: &str, results: Vec<Value>) -> Self {
    self.listings.insert(
      format!("/rest/api/space/{space_key}/content"),
      Listing::Paged {
        envelope: Envelope::GroupedPages,
        results,
      },
    );
    self
  }

  /// Serve `results` as the attachment listing of a page.
  pub fn with_attachments(mut self, page_id: &str, results: Vec<Value>) -> Self {
    self.listings.insert(
      format!("/rest/api/content/{page_id}/child/attachment"),
      Listing::Paged {
        envelope: Envelope::Flat,
        results,
      },
    );
    self
  }

  pub fn with_spaces(mut self, results: Vec<Value>) -> Self {
    self.listings.insert(
      "/rest/api/space".to_string(),
      Listing::Paged {
        envelope: Envelope::Flat,
        results,
      },
    );
    self
  }

  /// Answer every request to `path` with the same document.
  pub fn with_raw_response(mut self, path: &str, response: Value) -> Self {
    self.listings.insert(path.to_string(), Listing::Raw(response));
    self
  }

  pub fn with_binary(mut self, location: &str, content_type: &str, bytes: &[u8]) -> Self {
    self.binaries.insert(
      location.to_string(),
      BinaryBody {
        content_type: Some(content_type.to_string()),
        bytes: bytes.to_vec(),
      },
    );
    self
  }

  pub fn requests(&self) -> Vec<Request> {
    self.requests.lock().unwrap().clone()
  }

  /// `start` values of the listing requests sent to `path`.
  pub fn starts_for(&self, path: &str) -> Vec<usize> {
    self
      .requests()
      .into_iter()
      .filter_map(|request| match request {
        Request::Json { path: p, start, .. } if p == path => Some(start),
        _ => None,
      })
      .collect()
  }

  pub fn binary_requests(&self) -> usize {
    self
      .requests()
      .iter()
      .filter(|request| matches!(request, Request::Binary { .. }))
      .count()
  }
}

fn query_number(query: &[(String, String)], key: &str) -> Result<usize> {
  query
    .iter()
    .find(|(name, _)| name == key)
    .ok_or_else(|| anyhow!("missing query parameter {key}"))?
    .1
    .parse()
    .map_err(|err| anyhow!("bad {key}: {err}"))
}

#[async_trait]
impl ConfluenceApi for FakeConfluence {
  async fn get_json(&self, endpoint: &Endpoint, query: &[(String, String)]) -> Result<Value> {
    let path = endpoint.to_string();
    let start = query_number(query, "start")?;
    let limit = query_number(query, "limit")?;
    self.requests.lock().unwrap().push(Request::Json {
      path: path.clone(),
      start,
      limit,
    });

    let listing = self
      .listings
      .get(&path)
      .ok_or_else(|| anyhow!("Confluence API returned error 404 Not Found for {path}"))?;

    match listing {
      Listing::Raw(response) => Ok(response.clone()),
      Listing::Paged { envelope, results } => {
        let page: Vec<Value> = results.iter().skip(start).take(limit).cloned().collect();
        let body = json!({"results": page, "start": start, "limit": limit, "size": page.len()});
        Ok(match envelope {
          Envelope::Flat => body,
          Envelope::GroupedPages => json!({"page": body}),
        })
      }
    }
  }

  async fn get_binary(&self, location: &str) -> Result<BinaryBody> {
    self.requests.lock().unwrap().push(Request::Binary {
      location: location.to_string(),
    });
    self
      .binaries
      .get(location)
      .cloned()
      .ok_or_else(|| anyhow!("Failed to fetch {location}: 404 Not Found"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn query(start: usize, limit: usize) -> Vec<(String, String)> {
    vec![
      ("limit".to_string(), limit.to_string()),
      ("start".to_string(), start.to_string()),
    ]
  }

  #[tokio::test]
  async fn test_slices_results_by_start_and_limit() {
    let client = FakeConfluence::new().with_spaces((0..5).map(|n| json!(n)).collect());
    let endpoint = Endpoint::rest_api().join("space");

    let page = client.get_json(&endpoint, &query(2, 2)).await.unwrap();

    assert_eq!(page["results"], json!([2, 3]));
    assert_eq!(client.starts_for("/rest/api/space"), vec![2]);
  }

  #[tokio::test]
  async fn test_unknown_path_is_an_error() {
    let client = FakeConfluence::new();
    let endpoint = Endpoint::rest_api().join("nope");
    assert!(client.get_json(&endpoint, &query(0, 1)).await.is_err());
  }
}
