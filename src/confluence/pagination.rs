//! Offset-based pagination over Confluence listing endpoints.
//!
//! Every listing (spaces, space content, page attachments) goes through the
//! same primitive: request `{limit, start}`, validate the page, yield its
//! results, and stop once a page comes back shorter than `limit`. A page that
//! is exactly `limit` long always triggers one more request, so a listing
//! that ends on a limit boundary costs one extra, empty round-trip.

use anyhow::{Context, Result};
use futures::stream::{self, Stream, TryStreamExt};
use tracing::debug;

use super::api::{ConfluenceApi, Endpoint};
use super::models::{Attachment, ContentPage, ListingPage, Space, SpaceContent};
use super::schema::{self, Schema};

/// A validated listing response that can hand out its results.
pub trait Listing: Schema {
  type Item;

  fn into_results(self) -> Vec<Self::Item>;
}

impl<T: Schema> Listing for ListingPage<T> {
  type Item = T;

  fn into_results(self) -> Vec<T> {
    self.results
  }
}

impl Listing for SpaceContent {
  type Item = ContentPage;

  fn into_results(self) -> Vec<ContentPage> {
    self.page.results
  }
}

/// Everything needed to walk one listing endpoint.
#[derive(Debug, Clone)]
pub struct ListingRequest {
  pub endpoint: Endpoint,
  /// Query parameters sent with every page, in addition to `limit` and
  /// `start`.
  pub query: Vec<(String, String)>,
  /// Page size; clamped to at least 1.
  pub limit: usize,
  /// First line of the validation error when a page is malformed.
  pub context: String,
}

impl ListingRequest {
  /// `GET /rest/api/space`
  pub fn spaces(limit: usize) -> Self {
    Self {
      endpoint: Endpoint::rest_api().join("space"),
      query: Vec::new(),
      limit,
      context: "Invalid response from Confluence API while fetching spaces.".to_string(),
    }
  }

  /// `GET /rest/api/space/{key}/content?expand=body.storage`
  pub fn space_content(space_key: &str, limit: usize) -> Self {
    Self {
      endpoint: Endpoint::rest_api().join("space").join(space_key).join("content"),
      query: vec![("expand".to_string(), "body.storage".to_string())],
      limit,
      context: format!("Invalid response from Confluence API while fetching content of space {space_key}."),
    }
  }

  /// `GET /rest/api/content/{id}/child/attachment`
  pub fn page_attachments(page_id: &str, limit: usize) -> Self {
    Self {
      endpoint: Endpoint::rest_api()
        .join("content")
        .join(page_id)
        .join("child")
        .join("attachment"),
      query: Vec::new(),
      limit,
      context: format!("Failed to fetch attachments for page {page_id}."),
    }
  }

  fn page_query(&self, start: usize) -> Vec<(String, String)> {
    let mut query = self.query.clone();
    query.push(("limit".to_string(), self.limit().to_string()));
    query.push(("start".to_string(), start.to_string()));
    query
  }

  fn limit(&self) -> usize {
    self.limit.max(1)
  }
}

/// Lazily walk a listing, yielding every result exactly once, in order.
///
/// The stream is restartable per call but not resumable: calling this again
/// starts over at `start = 0`. It ends with the first error.
pub fn paginate<'a, L>(client: &'a dyn ConfluenceApi, request: ListingRequest) -> impl Stream<Item = Result<L::Item>> + 'a
where
  L: Listing + 'a,
  L::Item: 'a,
{
  stream::try_unfold(Some(0usize), move |cursor| {
    let request = request.clone();
    async move {
      let Some(start) = cursor else {
        return Ok(None);
      };

      let results = fetch_page::<L>(client, &request, start).await?;
      let count = results.len();
      debug!(endpoint = %request.endpoint, start, count, "Fetched listing page");

      let next = if count < request.limit() {
        None
      } else {
        Some(start + count)
      };
      Ok::<_, anyhow::Error>(Some((results, next)))
    }
  })
  .map_ok(|results| stream::iter(results.into_iter().map(Ok)))
  .try_flatten()
}

/// Walk a listing to the end and collect all results.
pub async fn collect_all<L: Listing>(client: &dyn ConfluenceApi, request: ListingRequest) -> Result<Vec<L::Item>> {
  paginate::<L>(client, request).try_collect().await
}

async fn fetch_page<L: Listing>(client: &dyn ConfluenceApi, request: &ListingRequest, start: usize) -> Result<Vec<L::Item>> {
  let raw = client
    .get_json(&request.endpoint, &request.page_query(start))
    .await
    .with_context(|| format!("Failed to fetch {} (start={start})", request.endpoint))?;

  let page: L = schema::validate(raw, &request.context)?;
  Ok(page.into_results())
}

/// Fetch every space visible to the caller.
pub async fn fetch_spaces(client: &dyn ConfluenceApi, limit: usize) -> Result<Vec<Space>> {
  collect_all::<ListingPage<Space>>(client, ListingRequest::spaces(limit)).await
}

/// Fetch every attachment of a page.
pub async fn fetch_page_attachments(client: &dyn ConfluenceApi, page_id: &str, limit: usize) -> Result<Vec<Attachment>> {
  collect_all::<ListingPage<Attachment>>(client, ListingRequest::page_attachments(page_id, limit)).await
}
