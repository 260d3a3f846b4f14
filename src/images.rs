//! Embedded image handling for Confluence storage markup.
//!
//! Finds `<ac:image>` blocks that reference page attachments, matches them to
//! the page's attachment records, downloads their bytes, and rewrites the
//! markup so each image is replaced by a textual description (or a
//! placeholder explaining why none is available).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::confluence::{Attachment, ConfluenceApi};
use crate::error::ImageError;
use crate::plaintext::decode_entities;

static IMAGE_BLOCK: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?is)<ac:image[^>]*>.*?</ac:image\s*>").unwrap_or_else(|err| panic!("invalid image pattern: {err}"))
});

static ATTACHMENT_FILENAME: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"(?is)<ri:attachment\s[^>]*?ri:filename\s*=\s*"([^"]+)""#)
    .unwrap_or_else(|err| panic!("invalid filename pattern: {err}"))
});

/// Why an image has no generated description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  /// No attachment on the page carries the referenced filename.
  AttachmentNotFound,
  /// The attachment exists but is not an image.
  NotAnImage,
  /// Download or description generation failed.
  DescriptionUnavailable,
}

impl Placeholder {
  fn label(self) -> &'static str {
    match self {
      Placeholder::AttachmentNotFound => "Anhang nicht gefunden",
      Placeholder::NotAnImage => "kein Bild",
      Placeholder::DescriptionUnavailable => "Beschreibung nicht verfügbar",
    }
  }
}

/// Resolution state of an image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageText {
  /// Not processed yet.
  Pending,
  /// An AI-generated description.
  Described(String),
  /// No description; the placeholder explains why.
  Unavailable(Placeholder),
}

/// An image embedded in a page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
  /// The attachment filename the image points at.
  pub filename: String,
  /// The verbatim `<ac:image>…</ac:image>` span from the markup.
  pub original_tag: String,
  /// Identifier of the matching attachment, once matched.
  pub attachment_id: Option<String>,
  pub text: ImageText,
}

impl ImageReference {
  /// Markup replacing the original tag, or `None` while still pending.
  pub fn replacement(&self) -> Option<String> {
    let text = match &self.text {
      ImageText::Pending => return None,
      ImageText::Described(description) => description.clone(),
      ImageText::Unavailable(placeholder) => format!("{} ({})", self.filename, placeholder.label()),
    };
    Some(format!(r#"<span class="image-description">[Bild: {text}]</span>"#))
  }
}

/// Extract attachment image references from storage markup.
///
/// Returns references in order of first occurrence. Image blocks without an
/// attachment filename (e.g. external URLs) are skipped.
pub fn extract_image_references(storage_content: &str) -> Vec<ImageReference> {
  IMAGE_BLOCK
    .find_iter(storage_content)
    .filter_map(|block| {
      let original_tag = block.as_str();
      let filename = ATTACHMENT_FILENAME.captures(original_tag)?.get(1)?.as_str();
      Some(ImageReference {
        filename: decode_entities(filename),
        original_tag: original_tag.to_string(),
        attachment_id: None,
        text: ImageText::Pending,
      })
    })
    .collect()
}

/// Match references to attachments by exact, case-sensitive filename.
///
/// The first attachment in listing order wins when several share a title.
pub fn match_images_to_attachments(image_refs: Vec<ImageReference>, attachments: &[Attachment]) -> Vec<ImageReference> {
  image_refs
    .into_iter()
    .map(|mut image| {
      image.attachment_id = attachments
        .iter()
        .find(|attachment| attachment.title == image.filename)
        .map(|attachment| attachment.id.clone());
      image
    })
    .collect()
}

/// Download an attachment's raw bytes.
///
/// # Errors
/// Fails when the attachment has no download link, the request fails, the
/// server answers with a textual document instead of binary data, or the
/// body is empty.
pub async fn download_image(client: &dyn ConfluenceApi, attachment: &Attachment) -> Result<Vec<u8>, ImageError> {
  let location = attachment
    .download_link()
    .ok_or_else(|| ImageError::MissingDownloadLink {
      filename: attachment.title.clone(),
    })?;

  let body = client
    .get_binary(location)
    .await
    .map_err(|err| ImageError::Download {
      location: location.to_string(),
      reason: format!("{err:#}"),
    })?;

  if let Some(content_type) = body.content_type.as_deref()
    && is_textual(content_type)
  {
    return Err(ImageError::NotBinary {
      location: location.to_string(),
      content_type: content_type.to_string(),
    });
  }

  if body.bytes.is_empty() {
    return Err(ImageError::EmptyDownload {
      location: location.to_string(),
    });
  }

  Ok(body.bytes)
}

/// Login pages and API error documents come back as text or JSON.
fn is_textual(content_type: &str) -> bool {
  let media_type = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
  media_type.starts_with("text/") || media_type == "application/json" || media_type.ends_with("+json")
}

/// Replace each resolved reference's original span (first occurrence) with
/// its description or placeholder. Everything else stays byte-identical.
pub fn replace_image_tags_with_descriptions(markup: &str, image_refs: &[ImageReference]) -> String {
  let mut result = markup.to_string();

  for image in image_refs {
    if let Some(replacement) = image.replacement() {
      result = result.replacen(&image.original_tag, &replacement, 1);
    }
  }

  result
}
