//! Per-page assembly: optional image enrichment, plain text, output record.
//!
//! [`PageAssembler`] turns one [`ContentPage`] into a [`ParsedPage`]. Image
//! enrichment is best-effort: every failure below the page (attachment
//! listing, download, description) degrades to a placeholder and a
//! [`PageWarning`], never to a page error. The record's `body` is always the
//! markup exactly as fetched; only `plainText` carries descriptions.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::confluence::pagination::fetch_page_attachments;
use crate::confluence::{Attachment, ConfluenceApi, ContentPage};
use crate::error::ImageError;
use crate::images::{
  self, ImageReference, ImageText, Placeholder, extract_image_references, match_images_to_attachments,
  replace_image_tags_with_descriptions,
};
use crate::plaintext::build_page_text;
use crate::vision::{AiVisionConfig, VisionTransport, describe_image};

/// One output unit, serialized into the item's `content` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPage {
  pub space_key: String,
  pub space_name: String,
  pub id: String,
  pub title: String,
  /// Storage markup as fetched, never rewritten.
  pub body: String,
  pub plain_text: String,
  pub webui_link: String,
}

/// A degraded enrichment step on an otherwise successful page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageWarning {
  AttachmentsUnavailable { reason: String },
  AttachmentNotFound { filename: String },
  NotAnImage { filename: String, media_type: String },
  DescriptionFailed { filename: String, reason: String },
}

impl fmt::Display for PageWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PageWarning::AttachmentsUnavailable { reason } => write!(f, "attachments unavailable: {reason}"),
      PageWarning::AttachmentNotFound { filename } => write!(f, "no attachment named '{filename}'"),
      PageWarning::NotAnImage { filename, media_type } => write!(f, "'{filename}' is {media_type}, not an image"),
      PageWarning::DescriptionFailed { filename, reason } => write!(f, "could not describe '{filename}': {reason}"),
    }
  }
}

/// A page record plus everything that degraded while building it.
#[derive(Debug, Clone)]
pub struct PageOutcome {
  pub page: ParsedPage,
  pub warnings: Vec<PageWarning>,
}

/// Builds page records for one run.
pub struct PageAssembler<'a> {
  client: &'a dyn ConfluenceApi,
  vision: Option<(&'a dyn VisionTransport, &'a AiVisionConfig)>,
  base_url: &'a str,
  attachment_page_size: usize,
}

impl<'a> PageAssembler<'a> {
  /// An assembler without image enrichment.
  pub fn new(client: &'a dyn ConfluenceApi, base_url: &'a str, attachment_page_size: usize) -> Self {
    Self {
      client,
      vision: None,
      base_url,
      attachment_page_size,
    }
  }

  /// Enable image enrichment through the given provider.
  pub fn with_vision(mut self, transport: &'a dyn VisionTransport, config: &'a AiVisionConfig) -> Self {
    self.vision = Some((transport, config));
    self
  }

  /// Assemble the output record for one page. Never fails.
  pub async fn process_page(&self, space_key: &str, space_name: &str, page: &ContentPage) -> PageOutcome {
    let body = page.storage_value();
    let mut warnings = Vec::new();

    let text_source = match self.vision {
      Some((transport, config)) => self.enrich_body(transport, config, page, &mut warnings).await,
      None => body.to_string(),
    };

    let parsed = ParsedPage {
      space_key: space_key.to_string(),
      space_name: space_name.to_string(),
      id: page.id.clone(),
      title: page.title.clone(),
      body: body.to_string(),
      plain_text: build_page_text(space_name, space_key, &page.title, &text_source),
      webui_link: page.web_ui().map(|link| self.absolute_link(link)).unwrap_or_default(),
    };

    info!(page_id = %parsed.id, title = %parsed.title, warnings = warnings.len(), "Processed page");
    PageOutcome {
      page: parsed,
      warnings,
    }
  }

  /// Body with image blocks replaced by descriptions or placeholders. Falls
  /// back to the unmodified body when attachments cannot be listed.
  async fn enrich_body(
    &self,
    transport: &dyn VisionTransport,
    config: &AiVisionConfig,
    page: &ContentPage,
    warnings: &mut Vec<PageWarning>,
  ) -> String {
    let body = page.storage_value();
    let image_refs = extract_image_references(body);
    if image_refs.is_empty() {
      return body.to_string();
    }
    debug!(page_id = %page.id, images = image_refs.len(), "Enriching images");

    let attachments = match fetch_page_attachments(self.client, &page.id, self.attachment_page_size).await {
      Ok(attachments) => attachments,
      Err(err) => {
        let reason = format!("{err:#}");
        warn!(page_id = %page.id, error = %reason, "Skipping image enrichment");
        warnings.push(PageWarning::AttachmentsUnavailable { reason });
        return body.to_string();
      }
    };

    let mut image_refs = match_images_to_attachments(image_refs, &attachments);
    for image in &mut image_refs {
      image.text = self.resolve_image(transport, config, image, &attachments, warnings).await;
    }

    replace_image_tags_with_descriptions(body, &image_refs)
  }

  async fn resolve_image(
    &self,
    transport: &dyn VisionTransport,
    config: &AiVisionConfig,
    image: &ImageReference,
    attachments: &[Attachment],
    warnings: &mut Vec<PageWarning>,
  ) -> ImageText {
    let attachment = image
      .attachment_id
      .as_deref()
      .and_then(|id| attachments.iter().find(|attachment| attachment.id == id));

    let Some(attachment) = attachment else {
      warn!(filename = %image.filename, "Image attachment not found");
      warnings.push(PageWarning::AttachmentNotFound {
        filename: image.filename.clone(),
      });
      return ImageText::Unavailable(Placeholder::AttachmentNotFound);
    };

    if let Some(media_type) = attachment.media_type()
      && !attachment.is_image()
    {
      warn!(filename = %image.filename, media_type, "Attachment is not an image");
      warnings.push(PageWarning::NotAnImage {
        filename: image.filename.clone(),
        media_type: media_type.to_string(),
      });
      return ImageText::Unavailable(Placeholder::NotAnImage);
    }

    match self.describe_attachment(transport, config, attachment).await {
      Ok(description) => ImageText::Described(description),
      Err(err) => {
        warn!(filename = %image.filename, error = %err, "Image description unavailable");
        warnings.push(PageWarning::DescriptionFailed {
          filename: image.filename.clone(),
          reason: err.to_string(),
        });
        ImageText::Unavailable(Placeholder::DescriptionUnavailable)
      }
    }
  }

  async fn describe_attachment(
    &self,
    transport: &dyn VisionTransport,
    config: &AiVisionConfig,
    attachment: &Attachment,
  ) -> Result<String, ImageError> {
    let bytes = images::download_image(self.client, attachment).await?;
    describe_image(transport, &bytes, &attachment.title, config).await
  }

  fn absolute_link(&self, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
      return link.to_string();
    }
    let base = self.base_url.trim_end_matches('/');
    if link.starts_with('/') {
      format!("{base}{link}")
    } else {
      format!("{base}/{link}")
    }
  }
}
