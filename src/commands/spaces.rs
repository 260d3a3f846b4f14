//! `spaces` subcommand: list every space visible to the configured user.

use std::path::Path;
use std::process;

use anyhow::{Context, Result};

use super::write_json;
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::confluence::{ConfluenceClient, fetch_spaces};

/// Execute the `spaces` subcommand, exiting with status 1 on failure.
pub(crate) async fn handle_spaces_command(page_size: usize, output: Option<&Path>, cli: &Cli, colors: &ColorScheme) {
  if let Err(error) = run_spaces_command(page_size, output, cli, colors).await {
    eprintln!("{} {}", colors.error("✗"), colors.error("Failed to list spaces"));
    eprintln!("  {}: {:#}", colors.emphasis("Error"), error);
    process::exit(1);
  }
}

async fn run_spaces_command(page_size: usize, output: Option<&Path>, cli: &Cli, colors: &ColorScheme) -> Result<()> {
  let base_url = cli.auth.url.as_deref().context("--url is required")?;

  eprintln!("{} {}", colors.progress("→"), colors.info("Listing spaces"));
  eprintln!("  {}: {}", colors.emphasis("Base URL"), colors.link(base_url));

  let client = ConfluenceClient::new(
    base_url,
    cli.auth.credential(),
    cli.performance.timeout,
    cli.performance.rate_limit,
  )
  .context("Unable to construct Confluence API client")?;

  let spaces = fetch_spaces(&client, page_size).await?;
  write_json(output, &spaces)?;

  eprintln!(
    "{} {}",
    colors.success("✓"),
    colors.info(format!(
      "Found {} {}",
      colors.number(spaces.len()),
      if spaces.len() == 1 { "space" } else { "spaces" }
    ))
  );

  Ok(())
}
