//! OpenAI chat completions with an inline data URL.

use serde_json::{Value, json};

use super::{AiVisionConfig, DESCRIPTION_PROMPT, EncodedImage, ProviderRequest, VisionBackend};

const DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub(super) struct OpenAi;

impl VisionBackend for OpenAi {
  fn default_model(&self) -> Option<&'static str> {
    Some("gpt-4o")
  }

  fn build_request(&self, image: &EncodedImage, config: &AiVisionConfig) -> ProviderRequest {
    let body = json!({
      "model": config.model(),
      "messages": [{
        "role": "user",
        "content": [
          {"type": "text", "text": DESCRIPTION_PROMPT},
          {"type": "image_url", "image_url": {"url": image.data_url()}},
        ],
      }],
      "max_tokens": config.max_tokens(),
      "temperature": config.temperature(),
    });

    ProviderRequest::new(config.api_url().unwrap_or(DEFAULT_URL), body).bearer(config.api_key())
  }

  fn extract_description<'a>(&self, response: &'a Value) -> Option<&'a str> {
    response.pointer("/choices/0/message/content")?.as_str()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::vision::VisionProvider;

  fn image() -> EncodedImage {
    EncodedImage {
      media_type: "image/png",
      base64: "iVBORw0K".to_string(),
    }
  }

  #[test]
  fn test_request_shape() {
    let config = AiVisionConfig::new(VisionProvider::OpenAi, Some("sk-test".to_string()), None, None).unwrap();

    let request = OpenAi.build_request(&image(), &config);

    assert_eq!(request.url, DEFAULT_URL);
    assert_eq!(request.header_value("Authorization"), Some("Bearer sk-test"));
    assert_eq!(request.body["model"], "gpt-4o");
    assert_eq!(request.body["max_tokens"], 150);
    assert_eq!(request.body["temperature"], 0.3);
    assert_eq!(request.body["messages"][0]["content"][0]["text"], DESCRIPTION_PROMPT);
    assert_eq!(
      request.body["messages"][0]["content"][1]["image_url"]["url"],
      "data:image/png;base64,iVBORw0K"
    );
  }

  #[test]
  fn test_custom_url_and_model() {
    let config = AiVisionConfig::new(
      VisionProvider::OpenAi,
      None,
      Some("https://proxy.local/v1/chat/completions".to_string()),
      Some("gpt-4o-mini".to_string()),
    )
    .unwrap();

    let request = OpenAi.build_request(&image(), &config);

    assert_eq!(request.url, "https://proxy.local/v1/chat/completions");
    assert_eq!(request.body["model"], "gpt-4o-mini");
    assert!(request.header_value("Authorization").is_none());
  }

  #[test]
  fn test_extract_description() {
    let response = json!({"choices": [{"message": {"role": "assistant", "content": "Ein Logo."}}]});
    assert_eq!(OpenAi.extract_description(&response), Some("Ein Logo."));
    assert_eq!(OpenAi.extract_description(&json!({"choices": []})), None);
    assert_eq!(OpenAi.extract_description(&json!({"choices": [{"message": {"content": null}}]})), None);
  }
}
