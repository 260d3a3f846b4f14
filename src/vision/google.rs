//! Google Generative Language `generateContent` with inline data.

use serde_json::{Value, json};
use url::form_urlencoded;

use super::{AiVisionConfig, DESCRIPTION_PROMPT, EncodedImage, ProviderRequest, VisionBackend};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub(super) struct Google;

impl Google {
  fn default_url(config: &AiVisionConfig) -> String {
    let model = config.model().unwrap_or_default();
    let key: String = form_urlencoded::byte_serialize(config.api_key().unwrap_or_default().as_bytes()).collect();
    format!("{API_BASE}/{model}:generateContent?key={key}")
  }
}

impl VisionBackend for Google {
  fn default_model(&self) -> Option<&'static str> {
    Some("gemini-pro-vision")
  }

  fn build_request(&self, image: &EncodedImage, config: &AiVisionConfig) -> ProviderRequest {
    let body = json!({
      "contents": [{
        "parts": [
          {"text": DESCRIPTION_PROMPT},
          {"inline_data": {"mime_type": image.media_type, "data": image.base64}},
        ],
      }],
      "generationConfig": {
        "maxOutputTokens": config.max_tokens(),
        "temperature": config.temperature(),
      },
    });

    let url = match config.api_url() {
      Some(url) => url.to_string(),
      None => Self::default_url(config),
    };
    ProviderRequest::new(url, body)
  }

  fn extract_description<'a>(&self, response: &'a Value) -> Option<&'a str> {
    response.pointer("/candidates/0/content/parts/0/text")?.as_str()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::vision::VisionProvider;

  fn image() -> EncodedImage {
    EncodedImage {
      media_type: "image/webp",
      base64: "UklGR".to_string(),
    }
  }

  #[test]
  fn test_key_travels_in_query() {
    let config = AiVisionConfig::new(VisionProvider::Google, Some("g key".to_string()), None, None).unwrap();

    let request = Google.build_request(&image(), &config);

    assert_eq!(
      request.url,
      "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro-vision:generateContent?key=g+key"
    );
    assert!(request.headers.is_empty());
    assert_eq!(request.body["generationConfig"]["maxOutputTokens"], 150);
    assert_eq!(request.body["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/webp");
  }

  #[test]
  fn test_explicit_url_is_used_verbatim() {
    let config = AiVisionConfig::new(
      VisionProvider::Google,
      Some("ignored".to_string()),
      Some("https://gateway.local/gemini".to_string()),
      None,
    )
    .unwrap();

    assert_eq!(Google.build_request(&image(), &config).url, "https://gateway.local/gemini");
  }

  #[test]
  fn test_extract_description() {
    let response = json!({"candidates": [{"content": {"parts": [{"text": "Ein Screenshot."}]}}]});
    assert_eq!(Google.extract_description(&response), Some("Ein Screenshot."));
    assert_eq!(Google.extract_description(&json!({"candidates": []})), None);
  }
}
