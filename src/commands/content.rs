//! `content` subcommand: export a space's pages as JSON records.

use std::process;

use anyhow::{Context, Result};
use serde_json::Value;

use super::{read_items, write_json};
use crate::cli::{Cli, ContentArgs, VisionOptions};
use crate::color::ColorScheme;
use crate::confluence::ConfluenceClient;
use crate::error::ConfigError;
use crate::pipeline::{IngestConfig, Item, run_pipeline};
use crate::vision::{AiVisionConfig, HttpVisionClient};

/// Execute the `content` subcommand, exiting with status 1 on failure.
pub(crate) async fn handle_content_command(args: &ContentArgs, cli: &Cli, colors: &ColorScheme) {
  if let Err(error) = run_content_command(args, cli, colors).await {
    eprintln!("{} {}", colors.error("✗"), colors.error("Content export failed"));
    eprintln!("  {}: {:#}", colors.emphasis("Error"), error);
    process::exit(1);
  }
}

async fn run_content_command(args: &ContentArgs, cli: &Cli, colors: &ColorScheme) -> Result<()> {
  let base_url = cli.auth.url.as_deref().context("--url is required")?;
  let vision = vision_config(&args.vision)?;

  let config = IngestConfig::new(base_url, args.space_key.as_deref().unwrap_or_default(), &args.space_name)?
    .with_page_size(args.page_size)?
    .with_vision(vision)
    .with_continuation(args.on_error);

  let items = read_items(args.input.as_deref())?;

  eprintln!("{} {}", colors.progress("→"), colors.info("Exporting Confluence content"));
  eprintln!("  {}: {}", colors.emphasis("Base URL"), colors.link(&config.base_url));
  if !config.space_key.is_empty() {
    eprintln!("  {}: {}", colors.emphasis("Space"), colors.emphasis(&config.space_key));
  }
  eprintln!("  {}: {}", colors.emphasis("Items"), colors.number(items.len()));
  if let Some(vision) = &config.vision {
    eprintln!("  {}: {}", colors.emphasis("Image descriptions"), colors.code(vision.provider()));
  }

  let client = ConfluenceClient::new(
    base_url,
    cli.auth.credential(),
    cli.performance.timeout,
    cli.performance.rate_limit,
  )
  .context("Unable to construct Confluence API client")?;
  let vision_client = HttpVisionClient::new(cli.performance.timeout)?;

  let output = run_pipeline(&client, &vision_client, &config, items).await?;
  write_json(args.output.as_deref(), &output)?;

  let (pages, failed) = summarize(&output);
  eprintln!(
    "{} {}",
    colors.success("✓"),
    colors.info(format!(
      "Exported {} {}",
      colors.number(pages),
      if pages == 1 { "page" } else { "pages" }
    ))
  );
  if failed > 0 {
    eprintln!(
      "{} {}",
      colors.warning("⚠"),
      colors.warning(format!("{failed} of {} items failed", output.len()))
    );
  }
  if let Some(path) = &args.output {
    eprintln!("  {}: {}", colors.emphasis("Output"), colors.path(path.display()));
  }

  Ok(())
}

fn vision_config(options: &VisionOptions) -> Result<Option<AiVisionConfig>, ConfigError> {
  if !options.describe_images {
    return Ok(None);
  }

  let config = AiVisionConfig::new(
    options.vision_provider,
    options.vision_api_key.clone(),
    options.vision_api_url.clone(),
    options.vision_model.clone(),
  )?
  .with_max_tokens(options.vision_max_tokens)
  .with_temperature(options.vision_temperature);

  Ok(Some(config))
}

/// Exported page count and failed item count.
fn summarize(output: &[Item]) -> (usize, usize) {
  let pages = output
    .iter()
    .filter_map(|item| item.get("content").and_then(Value::as_array))
    .map(Vec::len)
    .sum();
  let failed = output.iter().filter(|item| item.contains_key("error")).count();
  (pages, failed)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::vision::VisionProvider;

  fn options(describe_images: bool, provider: VisionProvider) -> VisionOptions {
    VisionOptions {
      describe_images,
      vision_provider: provider,
      vision_api_key: Some("key".to_string()),
      vision_api_url: None,
      vision_model: None,
      vision_max_tokens: 99,
      vision_temperature: 0.1,
    }
  }

  #[test]
  fn test_vision_config_disabled_by_default() {
    assert!(vision_config(&options(false, VisionProvider::Custom)).unwrap().is_none());
  }

  #[test]
  fn test_vision_config_carries_overrides() {
    let config = vision_config(&options(true, VisionProvider::Google)).unwrap().unwrap();
    assert_eq!(config.provider(), VisionProvider::Google);
    assert_eq!(config.max_tokens(), 99);
    assert_eq!(config.temperature(), 0.1);
  }

  #[test]
  fn test_vision_config_custom_requires_url() {
    assert_eq!(
      vision_config(&options(true, VisionProvider::Custom)).unwrap_err(),
      ConfigError::MissingApiUrl
    );
  }

  #[test]
  fn test_summarize() {
    let output: Vec<Item> = vec![
      json!({"content": [{}, {}]}),
      json!({"error": "boom"}),
      json!({"content": []}),
    ]
    .into_iter()
    .filter_map(|value| value.as_object().cloned())
    .collect();

    assert_eq!(summarize(&output), (2, 1));
  }
}
