//! Conversion of Confluence storage markup into normalized plain text.
//!
//! The storage dialect is a small, closed tag set, so the conversion is an
//! ordered chain of regex rewrites rather than a full parser. Order matters:
//! structural tags must become whitespace markers before the generic tag
//! strip erases them, and whitespace is collapsed last.
//!
//! 1. Line breaks, paragraph and heading closers, list items, table rows and
//!    cells become newlines, `- ` bullets and tabs.
//! 2. Confluence container tags are unwrapped, macro parameters are dropped
//!    with their content, resource identifiers are removed.
//! 3. `<script>` and `<style>` blocks are removed with their content.
//! 4. Every remaining tag becomes a single space.
//! 5. `&nbsp; &amp; &lt; &gt; &quot; &#39;` are decoded.
//! 6. Runs of spaces and tabs collapse, and any whitespace run containing a
//!    newline (blank lines and `\r\n` included) becomes a single newline.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

fn regex(pattern: &str) -> Regex {
  Regex::new(pattern).unwrap_or_else(|err| panic!("invalid built-in pattern {pattern}: {err}"))
}

/// Structural tags mapped to their whitespace marker, applied in order.
static STRUCTURAL: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
  vec![
    (regex(r"(?i)<br\s*/?>"), "\n"),
    (regex(r"(?i)</p\s*>"), "\n\n"),
    (regex(r"(?i)</h[1-6]\s*>"), "\n\n"),
    (regex(r"(?i)<li(\s[^>]*)?>"), "- "),
    (regex(r"(?i)</li\s*>"), "\n"),
    (regex(r"(?i)<tr(\s[^>]*)?>"), "\n"),
    (regex(r"(?i)<t[dh](\s[^>]*)?>"), "\t"),
  ]
});

static MACRO_PARAMETER: Lazy<Regex> = Lazy::new(|| regex(r"(?is)<ac:parameter[^>]*>.*?</ac:parameter\s*>"));

static CONTAINER: Lazy<Regex> = Lazy::new(|| {
  regex(r"(?i)</?ac:(?:structured-macro|layout|layout-section|layout-cell|link|rich-text-body)(?:\s[^>]*)?>")
});

static RESOURCE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| regex(r"(?i)</?ri:[^>]*>"));

static SCRIPT_OR_STYLE: Lazy<Vec<Regex>> = Lazy::new(|| {
  vec![
    regex(r"(?is)<script[^>]*>.*?</script\s*>"),
    regex(r"(?is)<style[^>]*>.*?</style\s*>"),
  ]
});

static ANY_TAG: Lazy<Regex> = Lazy::new(|| regex(r"<[^>]+>"));

static ENTITY: Lazy<Regex> = Lazy::new(|| regex(r"&(nbsp|amp|lt|gt|quot|#39);"));

static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| regex(r"[ \t]+"));

static SPACE_AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| regex(r"\s*\n\s*"));

/// Convert storage markup into plain text.
///
/// Pure and deterministic; plain input without markup or entities passes
/// through unchanged apart from whitespace normalization.
pub fn to_plaintext(markup: &str) -> String {
  if markup.is_empty() {
    return String::new();
  }

  let mut text = markup.to_string();

  for (pattern, marker) in STRUCTURAL.iter() {
    text = pattern.replace_all(&text, *marker).into_owned();
  }

  text = MACRO_PARAMETER.replace_all(&text, "").into_owned();
  text = CONTAINER.replace_all(&text, "").into_owned();
  text = RESOURCE_IDENTIFIER.replace_all(&text, "").into_owned();

  for pattern in SCRIPT_OR_STYLE.iter() {
    text = pattern.replace_all(&text, "").into_owned();
  }

  text = ANY_TAG.replace_all(&text, " ").into_owned();
  text = decode_entities(&text);

  let text = HORIZONTAL_SPACE.replace_all(&text, " ");
  let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
  text.trim().to_string()
}

/// Decode the fixed entity set in a single pass, so `&amp;lt;` stays `&lt;`.
pub(crate) fn decode_entities(text: &str) -> String {
  ENTITY
    .replace_all(text, |caps: &Captures| match &caps[1] {
      "nbsp" => " ",
      "amp" => "&",
      "lt" => "<",
      "gt" => ">",
      "quot" => "\"",
      _ => "'",
    })
    .into_owned()
}

/// Compose a page's plain text with provenance lines.
///
/// Emits `Space: <name> (<key>)` when a space name is known and
/// `Titel: <title>` when the title is non-empty, followed by the converted
/// body, separated by blank lines.
pub fn build_page_text(space_name: &str, space_key: &str, title: &str, body_markup: &str) -> String {
  let mut parts = Vec::with_capacity(3);
  if !space_name.is_empty() {
    parts.push(format!("Space: {space_name} ({space_key})"));
  }
  if !title.is_empty() {
    parts.push(format!("Titel: {title}"));
  }

  let body = to_plaintext(body_markup);
  if !body.is_empty() {
    parts.push(body);
  }

  parts.join("\n\n")
}
