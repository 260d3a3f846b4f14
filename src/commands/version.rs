//! Version/metadata reporting.
//!
//! Implements the `confluence-ingest version` subcommand, which prints either
//! a human-readable summary or a JSON document describing the build.

use serde_json::json;

use crate::color::ColorScheme;

/// Render version and build metadata in JSON or human-readable form.
///
/// # Arguments
/// * `json` - When `true`, emit a JSON document instead of colored text.
/// * `short` - When `true`, print only the semantic version string.
/// * `colors` - Shared color palette for styled terminal output.
pub(crate) fn handle_version_command(json: bool, short: bool, colors: &ColorScheme) {
  let version = env!("CARGO_PKG_VERSION");

  if short {
    println!("{version}");
    return;
  }

  let info = BuildInfo::current();
  if json {
    println!("{}", info.to_json());
    return;
  }

  println!("{} {}", colors.emphasis("confluence-ingest"), colors.number(version));
  println!("{}: {}", colors.emphasis("Git commit"), colors.code(info.git_hash));
  println!("{}: {}", colors.emphasis("Built"), colors.dimmed(&info.built));
  println!("{}: {}", colors.emphasis("Target"), info.target);
  println!("{}: {}", colors.emphasis("Rust version"), info.rust_version);
}

struct BuildInfo {
  version: &'static str,
  git_hash: &'static str,
  built: String,
  target: &'static str,
  rust_version: &'static str,
}

impl BuildInfo {
  fn current() -> Self {
    Self {
      version: env!("CARGO_PKG_VERSION"),
      git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
      built: format_timestamp(env!("BUILD_TIMESTAMP")),
      target: env!("TARGET"),
      rust_version: env!("RUSTC_VERSION"),
    }
  }

  fn to_json(&self) -> String {
    let document = json!({
      "version": self.version,
      "git_commit": self.git_hash,
      "build_timestamp": self.built,
      "target": self.target,
      "rust_version": self.rust_version,
    });
    serde_json::to_string_pretty(&document).unwrap_or_else(|_| document.to_string())
  }
}

/// Convert the embedded build timestamp (Unix epoch seconds) into an
/// ISO-8601 string, or return the raw input when it does not parse.
fn format_timestamp(timestamp: &str) -> String {
  timestamp
    .parse::<i64>()
    .ok()
    .and_then(|ts| chrono::DateTime::<chrono::Utc>::from_timestamp(ts, 0))
    .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_timestamp() {
    assert_eq!(format_timestamp("0"), "1970-01-01 00:00:00 UTC");
    assert_eq!(format_timestamp("1700000000"), "2023-11-14 22:13:20 UTC");
    assert_eq!(format_timestamp("not-a-number"), "not-a-number");
  }

  #[test]
  fn test_build_info_json_has_every_field() {
    let value: serde_json::Value = serde_json::from_str(&BuildInfo::current().to_json()).unwrap();
    for field in ["version", "git_commit", "build_timestamp", "target", "rust_version"] {
      assert!(value.get(field).is_some(), "missing {field}");
    }
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
  }
}
