//! Data transfer objects returned by the Confluence REST API.
//!
//! Every model also derives its JSON schema so responses can be validated as
//! a whole before they are deserialized.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A content container identified by a short key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Space {
  /// Numeric identifier assigned by Confluence.
  pub id: i64,
  /// Short key that uniquely identifies the space.
  pub key: String,
  /// Human-readable space name.
  pub name: String,
  #[serde(rename = "type")]
  /// Space classification such as `"global"` or `"personal"`.
  pub space_type: String,
  #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
  pub links: Option<Links>,
}

/// Hyperlinks attached to spaces and pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Links {
  #[serde(rename = "webui", default)]
  /// Path to the resource within the Confluence web UI.
  pub web_ui: Option<String>,
  #[serde(rename = "self", default)]
  /// Fully qualified API endpoint for the resource.
  pub self_link: Option<String>,
}

/// One page of a paginated listing.
///
/// A page holding fewer results than the requested `limit` is the last one.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ListingPage<T> {
  pub results: Vec<T>,
  #[serde(default)]
  pub start: Option<u64>,
  #[serde(default)]
  pub limit: Option<u64>,
  #[serde(default)]
  pub size: Option<u64>,
}

/// Response of `/rest/api/space/{key}/content`, which groups results by
/// content type.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct SpaceContent {
  pub page: ListingPage<ContentPage>,
  /// Blog posts are parsed for validation but never processed.
  #[serde(default)]
  pub blogpost: Option<ListingPage<ContentPage>>,
}

/// A single document in a space.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ContentPage {
  /// Unique identifier assigned by Confluence.
  pub id: String,
  #[serde(rename = "type")]
  /// Content type (`"page"` or `"blogpost"`).
  pub content_type: String,
  /// Human-readable title displayed in the UI.
  pub title: String,
  #[serde(default)]
  pub body: Option<ContentBody>,
  #[serde(rename = "_links", default)]
  pub links: Option<Links>,
}

/// Expanded body representations of a page.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ContentBody {
  #[serde(default)]
  pub storage: Option<StorageFormat>,
}

/// Storage format (Confluence's internal XHTML dialect).
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct StorageFormat {
  /// Raw markup returned by the API.
  pub value: String,
  #[serde(default)]
  pub representation: Option<String>,
}

impl ContentPage {
  /// Whether this content is a regular page (as opposed to a blog post).
  pub fn is_page(&self) -> bool {
    self.content_type == "page"
  }

  /// The raw storage markup, or an empty string when the body was not
  /// expanded.
  pub fn storage_value(&self) -> &str {
    self
      .body
      .as_ref()
      .and_then(|body| body.storage.as_ref())
      .map(|storage| storage.value.as_str())
      .unwrap_or("")
  }

  pub fn web_ui(&self) -> Option<&str> {
    self.links.as_ref().and_then(|links| links.web_ui.as_deref())
  }
}

/// A binary asset attached to a page.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct Attachment {
  /// Unique attachment identifier.
  pub id: String,
  /// Original filename displayed in Confluence.
  pub title: String,
  #[serde(default)]
  pub metadata: Option<MediaTypeInfo>,
  #[serde(default)]
  pub extensions: Option<MediaTypeInfo>,
  #[serde(rename = "_links", default)]
  pub links: Option<AttachmentLinks>,
}

/// Carrier of an attachment's MIME type. Server and Cloud report it in
/// different places.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, JsonSchema)]
pub struct MediaTypeInfo {
  #[serde(rename = "mediaType", default)]
  pub media_type: Option<String>,
}

/// Attachment links.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, JsonSchema)]
pub struct AttachmentLinks {
  /// Path to the attachment bytes, usually relative to the base URL.
  #[serde(default)]
  pub download: Option<String>,
}

impl Attachment {
  /// The reported MIME type, preferring `metadata` over `extensions`.
  pub fn media_type(&self) -> Option<&str> {
    reported_media_type(&self.metadata).or_else(|| reported_media_type(&self.extensions))
  }

  /// An attachment is an image iff its media type starts with `image/`.
  pub fn is_image(&self) -> bool {
    self.media_type().is_some_and(|media_type| media_type.starts_with("image/"))
  }

  pub fn download_link(&self) -> Option<&str> {
    self.links.as_ref().and_then(|links| links.download.as_deref())
  }
}

fn reported_media_type(info: &Option<MediaTypeInfo>) -> Option<&str> {
  info
    .as_ref()
    .and_then(|info| info.media_type.as_deref())
    .filter(|media_type| !media_type.is_empty())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::confluence::schema::validate;

  #[test]
  fn test_space_listing_validates() {
    let raw = json!({
      "results": [
        {"id": 98305, "key": "DOCS", "name": "Documentation", "type": "global",
         "_links": {"webui": "/display/DOCS", "self": "https://wiki.example.com/rest/api/space/DOCS"}}
      ],
      "start": 0,
      "limit": 50,
      "size": 1,
      "_links": {"base": "https://wiki.example.com"}
    });

    let page: ListingPage<Space> = validate(raw, "spaces").unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].key, "DOCS");
    assert_eq!(
      page.results[0].links.as_ref().and_then(|l| l.web_ui.as_deref()),
      Some("/display/DOCS")
    );
  }

  #[test]
  fn test_space_with_string_id_is_rejected() {
    let raw = json!({"results": [{"id": "98305", "key": "DOCS", "name": "Docs", "type": "global"}]});
    let err = validate::<ListingPage<Space>>(raw, "spaces").unwrap_err();
    assert_eq!(err.violations[0].path, "results.0.id");
    assert_eq!(err.violations[0].message, "Expected integer, received string");
  }

  #[test]
  fn test_space_serializes_with_api_field_names() {
    let space = Space {
      id: 1,
      key: "DOCS".to_string(),
      name: "Documentation".to_string(),
      space_type: "global".to_string(),
      links: Some(Links {
        web_ui: Some("/display/DOCS".to_string()),
        self_link: None,
      }),
    };

    let value = serde_json::to_value(&space).unwrap();
    assert_eq!(value["type"], "global");
    assert_eq!(value["_links"]["webui"], "/display/DOCS");
  }

  #[test]
  fn test_content_page_accessors() {
    let raw = json!({
      "page": {
        "results": [{
          "id": "123", "type": "page", "title": "Intro",
          "body": {"storage": {"value": "<p>Hi</p>", "representation": "storage"}},
          "_links": {"webui": "/display/DOCS/Intro"}
        }, {
          "id": "124", "type": "page", "title": "No body"
        }],
        "limit": 50, "size": 2
      }
    });

    let content: SpaceContent = validate(raw, "content").unwrap();
    let pages = content.page.results;
    assert!(pages[0].is_page());
    assert_eq!(pages[0].storage_value(), "<p>Hi</p>");
    assert_eq!(pages[0].web_ui(), Some("/display/DOCS/Intro"));
    assert_eq!(pages[1].storage_value(), "");
    assert_eq!(pages[1].web_ui(), None);
  }

  #[test]
  fn test_attachment_media_type_falls_back_to_extensions() {
    let raw = json!({
      "results": [
        {"id": "att1", "title": "chart.png", "extensions": {"mediaType": "image/png"},
         "_links": {"download": "/download/attachments/1/chart.png"}},
        {"id": "att2", "title": "handbuch.pdf", "metadata": {"mediaType": "application/pdf"}},
        {"id": "att3", "title": "blob"}
      ]
    });

    let page: ListingPage<Attachment> = validate(raw, "attachments").unwrap();
    let [chart, manual, blob] = &page.results[..] else {
      panic!("expected three attachments");
    };
    assert!(chart.is_image());
    assert_eq!(chart.download_link(), Some("/download/attachments/1/chart.png"));
    assert!(!manual.is_image());
    assert_eq!(blob.media_type(), None);
    assert!(!blob.is_image());
  }
}
