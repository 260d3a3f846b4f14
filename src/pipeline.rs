//! Item-level driver: one space listing per input item, pages in order.
//!
//! Every input item is a JSON object. Its output is the same object with a
//! `content` array of [`ParsedPage`] records merged in. When an item fails,
//! the [`ContinuationPolicy`] decides between annotating it with an `error`
//! field and aborting the run with an [`ItemError`].

use std::pin::pin;

use anyhow::{Context, Result};
use clap::ValueEnum;
use futures::TryStreamExt;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::confluence::pagination::{ListingRequest, paginate};
use crate::confluence::{ConfluenceApi, SpaceContent};
use crate::error::{ConfigError, ItemError};
use crate::processed_page::{PageAssembler, PageOutcome, ParsedPage};
use crate::vision::{AiVisionConfig, VisionTransport};

/// Listing page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// A host-supplied input item and, after the run, its output record.
pub type Item = Map<String, Value>;

/// What to do when an item fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ContinuationPolicy {
  /// Abort the run on the first failing item.
  #[default]
  FailFast,
  /// Record the failure on the item and move on.
  ContinueOnFail,
}

/// Immutable per-run configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
  pub base_url: String,
  /// Default space key; items may override it with a `spaceKey` field.
  pub space_key: String,
  /// Provenance label only; items may override it with `spaceName`.
  pub space_name: String,
  pub page_size: usize,
  /// Image enrichment is enabled iff this is set.
  pub vision: Option<AiVisionConfig>,
  pub continuation: ContinuationPolicy,
}

impl IngestConfig {
  /// # Errors
  /// Returns [`ConfigError::MissingBaseUrl`] for an empty base URL.
  pub fn new(base_url: &str, space_key: &str, space_name: &str) -> Result<Self, ConfigError> {
    let base_url = base_url.trim().trim_end_matches('/');
    if base_url.is_empty() {
      return Err(ConfigError::MissingBaseUrl);
    }

    Ok(Self {
      base_url: base_url.to_string(),
      space_key: space_key.trim().to_string(),
      space_name: space_name.trim().to_string(),
      page_size: DEFAULT_PAGE_SIZE,
      vision: None,
      continuation: ContinuationPolicy::default(),
    })
  }

  /// # Errors
  /// Returns [`ConfigError::InvalidPageSize`] for zero.
  pub fn with_page_size(mut self, page_size: usize) -> Result<Self, ConfigError> {
    if page_size == 0 {
      return Err(ConfigError::InvalidPageSize);
    }
    self.page_size = page_size;
    Ok(self)
  }

  pub fn with_vision(mut self, vision: Option<AiVisionConfig>) -> Self {
    self.vision = vision;
    self
  }

  pub fn with_continuation(mut self, continuation: ContinuationPolicy) -> Self {
    self.continuation = continuation;
    self
  }

  /// Space key and name for one item, item fields taking precedence.
  fn space_for(&self, item: &Item) -> Result<(String, String), ConfigError> {
    let key = string_field(item, "spaceKey")
      .or(Some(self.space_key.as_str()).filter(|key| !key.is_empty()))
      .ok_or(ConfigError::MissingSpaceKey)?;
    let name = string_field(item, "spaceName").unwrap_or(self.space_name.as_str());

    Ok((key.to_string(), name.to_string()))
  }
}

fn string_field<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
  item
    .get(name)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|value| !value.is_empty())
}

/// Fetch every page of a space and assemble its records, one page at a time.
///
/// Blog posts are skipped. Listing and validation failures abort the space;
/// image enrichment failures only show up as warnings on the outcomes.
pub async fn ingest_space(
  client: &dyn ConfluenceApi,
  vision: &dyn VisionTransport,
  config: &IngestConfig,
  space_key: &str,
  space_name: &str,
) -> Result<Vec<PageOutcome>> {
  let mut assembler = PageAssembler::new(client, &config.base_url, config.page_size);
  if let Some(vision_config) = &config.vision {
    assembler = assembler.with_vision(vision, vision_config);
  }

  let mut pages = pin!(paginate::<SpaceContent>(
    client,
    ListingRequest::space_content(space_key, config.page_size)
  ));

  let mut outcomes = Vec::new();
  while let Some(page) = pages.try_next().await? {
    if !page.is_page() {
      continue;
    }
    outcomes.push(assembler.process_page(space_key, space_name, &page).await);
  }

  Ok(outcomes)
}

/// Run every item in input order and produce one output record per item.
///
/// # Errors
/// Under [`ContinuationPolicy::FailFast`], the first failing item aborts the
/// run with an [`ItemError`] naming its index. Under
/// [`ContinuationPolicy::ContinueOnFail`] this never fails.
pub async fn run_pipeline(
  client: &dyn ConfluenceApi,
  vision: &dyn VisionTransport,
  config: &IngestConfig,
  items: Vec<Item>,
) -> Result<Vec<Item>, ItemError> {
  let mut output = Vec::with_capacity(items.len());

  for (item_index, mut item) in items.into_iter().enumerate() {
    match process_item(client, vision, config, &item).await {
      Ok(pages) => {
        info!(item_index, pages = pages.len(), "Item complete");
        item.insert("content".to_string(), Value::Array(pages));
      }
      Err(cause) if config.continuation == ContinuationPolicy::ContinueOnFail => {
        warn!(item_index, error = %format!("{cause:#}"), "Item failed, continuing");
        item.insert("error".to_string(), Value::String(format!("{cause:#}")));
      }
      Err(cause) => return Err(ItemError { item_index, cause }),
    }
    output.push(item);
  }

  Ok(output)
}

async fn process_item(
  client: &dyn ConfluenceApi,
  vision: &dyn VisionTransport,
  config: &IngestConfig,
  item: &Item,
) -> Result<Vec<Value>> {
  let (space_key, space_name) = config.space_for(item)?;
  info!(space_key = %space_key, "Ingesting space");

  let outcomes = ingest_space(client, vision, config, &space_key, &space_name).await?;
  outcomes
    .into_iter()
    .map(|outcome| serialize_page(&outcome.page))
    .collect()
}

fn serialize_page(page: &ParsedPage) -> Result<Value> {
  serde_json::to_value(page).with_context(|| format!("Failed to serialize page {}", page.id))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn item(value: Value) -> Item {
    match value {
      Value::Object(map) => map,
      other => panic!("not an object: {other}"),
    }
  }

  #[test]
  fn test_config_requires_base_url() {
    assert_eq!(IngestConfig::new("  ", "DOCS", "").unwrap_err(), ConfigError::MissingBaseUrl);
    let config = IngestConfig::new("https://wiki.example.com/", "DOCS", "").unwrap();
    assert_eq!(config.base_url, "https://wiki.example.com");
    assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(config.continuation, ContinuationPolicy::FailFast);
  }

  #[test]
  fn test_config_rejects_zero_page_size() {
    let config = IngestConfig::new("https://wiki.example.com", "DOCS", "").unwrap();
    assert_eq!(config.with_page_size(0).unwrap_err(), ConfigError::InvalidPageSize);
  }

  #[test]
  fn test_item_fields_override_space() {
    let config = IngestConfig::new("https://wiki.example.com", "DOCS", "Docs").unwrap();

    assert_eq!(
      config.space_for(&item(json!({}))).unwrap(),
      ("DOCS".to_string(), "Docs".to_string())
    );
    assert_eq!(
      config
        .space_for(&item(json!({"spaceKey": "ENG", "spaceName": "Engineering"})))
        .unwrap(),
      ("ENG".to_string(), "Engineering".to_string())
    );
    assert_eq!(
      config.space_for(&item(json!({"spaceKey": " ", "spaceName": 3}))).unwrap(),
      ("DOCS".to_string(), "Docs".to_string())
    );
  }

  #[test]
  fn test_missing_space_key_is_a_config_error() {
    let config = IngestConfig::new("https://wiki.example.com", "", "").unwrap();
    assert_eq!(config.space_for(&item(json!({}))).unwrap_err(), ConfigError::MissingSpaceKey);
  }
}
