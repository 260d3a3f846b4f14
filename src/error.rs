//! Typed errors for the ingestion pipeline.
//!
//! Transport and orchestration code propagates `anyhow::Error` with context,
//! the same way the Confluence client does. The types here cover the failure
//! kinds callers branch on: a response that does not match its declared
//! shape, a failed image enrichment step, an invalid run configuration, and
//! the item-scoped abort raised under the fail-fast continuation policy.

use std::fmt;

use thiserror::Error;

/// A single field-level mismatch found while validating an API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
  /// Dotted path to the offending value; empty for the document root.
  pub path: String,
  /// Human-readable description of the mismatch.
  pub message: String,
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let path = if self.path.is_empty() { "(root)" } else { &self.path };
    write!(f, "{path}: {}", self.message)
  }
}

/// The Confluence API answered with a payload that does not match the shape
/// the caller declared. Nothing from such a response is used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}\n{}", format_violations(.violations))]
pub struct ValidationError {
  /// What the caller was doing when the response was rejected.
  pub context: String,
  /// Every mismatch found, in document order.
  pub violations: Vec<Violation>,
}

fn format_violations(violations: &[Violation]) -> String {
  violations
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("\n")
}

/// Failure of one image's enrichment step.
///
/// These never fail a page: the page assembler records a warning and the
/// image degrades to a placeholder in the plain text.
#[derive(Debug, Error)]
pub enum ImageError {
  #[error("Empty or invalid image data for file {filename}")]
  EmptyImage { filename: String },

  #[error("Unsupported image format: {media_type} for file {filename}")]
  UnsupportedFormat { media_type: String, filename: String },

  #[error("Attachment '{filename}' has no download link")]
  MissingDownloadLink { filename: String },

  #[error("Expected binary image data from {location} but received {content_type}")]
  NotBinary { location: String, content_type: String },

  #[error("Received empty image data from {location}")]
  EmptyDownload { location: String },

  #[error("Failed to download image from {location}: {reason}")]
  Download { location: String, reason: String },

  #[error("{provider} vision request failed for {filename}: {reason}")]
  Provider {
    provider: String,
    filename: String,
    reason: String,
  },
}

/// Invalid run configuration, detected before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("Unsupported AI vision provider: {0} (expected openai, anthropic, google or custom)")]
  UnknownProvider(String),

  #[error("The custom AI vision provider requires an API URL")]
  MissingApiUrl,

  #[error("A Confluence base URL is required")]
  MissingBaseUrl,

  #[error("A space key is required (pass --space-key or set spaceKey on the item)")]
  MissingSpaceKey,

  #[error("Page size must be at least 1")]
  InvalidPageSize,
}

/// An input item failed and the run was configured to stop on the first
/// failure.
#[derive(Debug, Error)]
#[error("Item {item_index} failed: {cause:#}")]
pub struct ItemError {
  /// Zero-based index of the failing input item.
  pub item_index: usize,
  /// The underlying failure.
  pub cause: anyhow::Error,
}
