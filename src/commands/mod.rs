//! CLI subcommand handlers.
//!
//! This module groups the implementations for each `confluence-ingest`
//! subcommand, keeping `cli.rs` limited to argument definitions and dispatch,
//! plus the JSON file handling the handlers share.

pub mod content;
pub mod spaces;
pub mod version;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::pipeline::Item;

/// Load input items from a JSON file.
///
/// The file holds either an array of objects or a single object. Without a
/// path, one empty item is returned so the run covers the configured space
/// once.
pub fn read_items(path: Option<&Path>) -> Result<Vec<Item>> {
  let Some(path) = path else {
    return Ok(vec![Map::new()]);
  };

  let raw = fs::read_to_string(path).with_context(|| format!("Failed to read input file {}", path.display()))?;
  let value: Value =
    serde_json::from_str(&raw).with_context(|| format!("Input file {} is not valid JSON", path.display()))?;

  match value {
    Value::Object(item) => Ok(vec![item]),
    Value::Array(values) => values
      .into_iter()
      .enumerate()
      .map(|(index, value)| -> Result<Item> {
        match value {
          Value::Object(item) => Ok(item),
          _ => bail!("Input item {index} in {} is not a JSON object", path.display()),
        }
      })
      .collect(),
    _ => bail!(
      "Input file {} must contain a JSON object or an array of objects",
      path.display()
    ),
  }
}

/// Write pretty-printed JSON to a file, or to stdout without a path.
pub fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;

  match path {
    Some(path) => {
      if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
      {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;
      }
      fs::write(path, format!("{json}\n")).with_context(|| format!("Failed to write output to {}", path.display()))
    }
    None => {
      println!("{json}");
      Ok(())
    }
  }
}
