//! Self-hosted endpoint with a flat JSON contract.

use serde_json::{Value, json};

use super::{AiVisionConfig, DESCRIPTION_PROMPT, EncodedImage, ProviderRequest, VisionBackend};

pub(super) struct Custom;

impl VisionBackend for Custom {
  fn default_model(&self) -> Option<&'static str> {
    None
  }

  fn build_request(&self, image: &EncodedImage, config: &AiVisionConfig) -> ProviderRequest {
    let body = json!({
      "image": image.base64,
      "mimeType": image.media_type,
      "prompt": DESCRIPTION_PROMPT,
      "maxTokens": config.max_tokens(),
      "temperature": config.temperature(),
    });

    // AiVisionConfig::new guarantees a URL for this provider.
    ProviderRequest::new(config.api_url().unwrap_or_default(), body).bearer(config.api_key())
  }

  fn extract_description<'a>(&self, response: &'a Value) -> Option<&'a str> {
    ["description", "text"]
      .iter()
      .find_map(|field| response.get(field).and_then(Value::as_str).filter(|text| !text.is_empty()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::vision::VisionProvider;

  #[test]
  fn test_request_shape() {
    let config = AiVisionConfig::new(
      VisionProvider::Custom,
      None,
      Some("https://vision.local/describe".to_string()),
      None,
    )
    .unwrap();
    let image = EncodedImage {
      media_type: "image/gif",
      base64: "R0lGOD".to_string(),
    };

    let request = Custom.build_request(&image, &config);

    assert_eq!(request.url, "https://vision.local/describe");
    assert!(request.headers.is_empty());
    assert_eq!(
      request.body,
      json!({
        "image": "R0lGOD",
        "mimeType": "image/gif",
        "prompt": DESCRIPTION_PROMPT,
        "maxTokens": 150,
        "temperature": 0.3,
      })
    );
  }

  #[test]
  fn test_description_then_text() {
    assert_eq!(Custom.extract_description(&json!({"description": "A", "text": "B"})), Some("A"));
    assert_eq!(Custom.extract_description(&json!({"description": "", "text": "B"})), Some("B"));
    assert_eq!(Custom.extract_description(&json!({"text": "B"})), Some("B"));
    assert_eq!(Custom.extract_description(&json!({"result": "C"})), None);
  }
}
