//! Anthropic messages API with a base64 image block.

use serde_json::{Value, json};

use super::{AiVisionConfig, DESCRIPTION_PROMPT, EncodedImage, ProviderRequest, VisionBackend};

const DEFAULT_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub(super) struct Anthropic;

impl VisionBackend for Anthropic {
  fn default_model(&self) -> Option<&'static str> {
    Some("claude-3-sonnet-20240229")
  }

  fn build_request(&self, image: &EncodedImage, config: &AiVisionConfig) -> ProviderRequest {
    let body = json!({
      "model": config.model(),
      "max_tokens": config.max_tokens(),
      "temperature": config.temperature(),
      "messages": [{
        "role": "user",
        "content": [
          {"type": "text", "text": DESCRIPTION_PROMPT},
          {
            "type": "image",
            "source": {"type": "base64", "media_type": image.media_type, "data": image.base64},
          },
        ],
      }],
    });

    let mut request =
      ProviderRequest::new(config.api_url().unwrap_or(DEFAULT_URL), body).header("anthropic-version", API_VERSION);
    if let Some(key) = config.api_key() {
      request = request.header("x-api-key", key);
    }
    request
  }

  fn extract_description<'a>(&self, response: &'a Value) -> Option<&'a str> {
    response.pointer("/content/0/text")?.as_str()
  }
}
