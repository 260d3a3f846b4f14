//! AI vision descriptions for embedded images.
//!
//! One capability, [`describe_image`], backed by four providers selected by
//! [`VisionProvider`]: OpenAI chat completions, Anthropic messages, Google
//! `generateContent`, and a custom endpoint with a flat JSON contract. Each
//! provider only knows how to shape its request and where the answer lives
//! in its response; validation, encoding, transport, and the fallback text
//! are shared.

mod anthropic;
mod custom;
mod google;
mod openai;
mod transport;

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::ValueEnum;
use serde_json::Value;
use tracing::{debug, error};

pub use transport::{HttpVisionClient, ProviderRequest, VisionTransport};

use crate::error::{ConfigError, ImageError};

/// Instruction sent with every image.
pub const DESCRIPTION_PROMPT: &str = "Beschreibe dieses Bild auf Deutsch in 1-2 prägnanten Sätzen. Fokussiere auf die wichtigsten visuellen Elemente, die für das Verständnis des Inhalts relevant sind. Beginne nicht mit \"Das Bild zeigt\" oder ähnlichen Phrasen.";

/// Returned when a provider answers without any usable text.
pub const FALLBACK_DESCRIPTION: &str = "Bild konnte nicht beschrieben werden.";

pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

const SUPPORTED_MEDIA_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Vision backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VisionProvider {
  #[value(name = "openai")]
  OpenAi,
  Anthropic,
  Google,
  Custom,
}

impl VisionProvider {
  pub fn as_str(self) -> &'static str {
    match self {
      VisionProvider::OpenAi => "openai",
      VisionProvider::Anthropic => "anthropic",
      VisionProvider::Google => "google",
      VisionProvider::Custom => "custom",
    }
  }

  fn backend(self) -> &'static dyn VisionBackend {
    match self {
      VisionProvider::OpenAi => &openai::OpenAi,
      VisionProvider::Anthropic => &anthropic::Anthropic,
      VisionProvider::Google => &google::Google,
      VisionProvider::Custom => &custom::Custom,
    }
  }
}

impl fmt::Display for VisionProvider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for VisionProvider {
  type Err = ConfigError;

  fn from_str(name: &str) -> Result<Self, Self::Err> {
    match name.trim().to_ascii_lowercase().as_str() {
      "openai" => Ok(VisionProvider::OpenAi),
      "anthropic" => Ok(VisionProvider::Anthropic),
      "google" => Ok(VisionProvider::Google),
      "custom" => Ok(VisionProvider::Custom),
      _ => Err(ConfigError::UnknownProvider(name.to_string())),
    }
  }
}

/// Per-run vision configuration. Read-only once built, shared by every
/// description request of a run.
#[derive(Clone, PartialEq)]
pub struct AiVisionConfig {
  provider: VisionProvider,
  api_key: Option<String>,
  api_url: Option<String>,
  model: Option<String>,
  max_tokens: u32,
  temperature: f64,
}

impl AiVisionConfig {
  /// Build a configuration with default token and temperature settings.
  ///
  /// # Errors
  /// Returns [`ConfigError::MissingApiUrl`] for the custom provider without
  /// an API URL.
  pub fn new(
    provider: VisionProvider,
    api_key: Option<String>,
    api_url: Option<String>,
    model: Option<String>,
  ) -> Result<Self, ConfigError> {
    let non_empty = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let api_url = non_empty(api_url);

    if provider == VisionProvider::Custom && api_url.is_none() {
      return Err(ConfigError::MissingApiUrl);
    }

    Ok(Self {
      provider,
      api_key: non_empty(api_key),
      api_url,
      model: non_empty(model),
      max_tokens: DEFAULT_MAX_TOKENS,
      temperature: DEFAULT_TEMPERATURE,
    })
  }

  /// Same as [`AiVisionConfig::new`] with the provider given by name.
  ///
  /// # Errors
  /// Returns [`ConfigError::UnknownProvider`] for names outside the fixed
  /// set.
  pub fn from_name(
    provider: &str,
    api_key: Option<String>,
    api_url: Option<String>,
    model: Option<String>,
  ) -> Result<Self, ConfigError> {
    Self::new(provider.parse()?, api_key, api_url, model)
  }

  pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
    self.max_tokens = max_tokens;
    self
  }

  pub fn with_temperature(mut self, temperature: f64) -> Self {
    self.temperature = temperature;
    self
  }

  pub fn provider(&self) -> VisionProvider {
    self.provider
  }

  pub fn api_key(&self) -> Option<&str> {
    self.api_key.as_deref()
  }

  pub fn api_url(&self) -> Option<&str> {
    self.api_url.as_deref()
  }

  /// The configured model, or the provider's default.
  pub fn model(&self) -> Option<&str> {
    self.model.as_deref().or(self.provider.backend().default_model())
  }

  pub fn max_tokens(&self) -> u32 {
    self.max_tokens
  }

  pub fn temperature(&self) -> f64 {
    self.temperature
  }
}

// Keep the API key out of logs.
impl fmt::Debug for AiVisionConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AiVisionConfig")
      .field("provider", &self.provider)
      .field("api_key", &self.api_key.as_ref().map(|_| "***"))
      .field("api_url", &self.api_url)
      .field("model", &self.model)
      .field("max_tokens", &self.max_tokens)
      .field("temperature", &self.temperature)
      .finish()
  }
}

/// Image bytes prepared for a provider request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
  pub media_type: &'static str,
  pub base64: String,
}

impl EncodedImage {
  fn data_url(&self) -> String {
    format!("data:{};base64,{}", self.media_type, self.base64)
  }
}

/// Request shape and response location of one vision API.
trait VisionBackend: Sync {
  fn default_model(&self) -> Option<&'static str>;

  fn build_request(&self, image: &EncodedImage, config: &AiVisionConfig) -> ProviderRequest;

  fn extract_description<'a>(&self, response: &'a Value) -> Option<&'a str>;
}

/// Infer an image media type from a filename extension, defaulting to PNG.
pub fn media_type_for(filename: &str) -> &'static str {
  let extension = filename
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();

  match extension.as_str() {
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "bmp" => "image/bmp",
    "svg" => "image/svg+xml",
    "tif" | "tiff" => "image/tiff",
    _ => "image/png",
  }
}

/// Generate a short German description of an image.
///
/// Validates the bytes and the media type before any network call. A
/// provider answer without text yields [`FALLBACK_DESCRIPTION`] instead of
/// an error.
///
/// # Errors
/// * [`ImageError::EmptyImage`] for zero bytes.
/// * [`ImageError::UnsupportedFormat`] for media types other than PNG, JPEG,
///   GIF and WebP.
/// * [`ImageError::Provider`] when the request itself fails. Never retried.
pub async fn describe_image(
  transport: &dyn VisionTransport,
  image: &[u8],
  filename: &str,
  config: &AiVisionConfig,
) -> Result<String, ImageError> {
  if image.is_empty() {
    return Err(ImageError::EmptyImage {
      filename: filename.to_string(),
    });
  }

  let media_type = media_type_for(filename);
  if !SUPPORTED_MEDIA_TYPES.contains(&media_type) {
    return Err(ImageError::UnsupportedFormat {
      media_type: media_type.to_string(),
      filename: filename.to_string(),
    });
  }

  let provider = config.provider();
  let backend = provider.backend();
  let encoded = EncodedImage {
    media_type,
    base64: BASE64.encode(image),
  };

  debug!(%provider, filename, media_type, bytes = image.len(), "Requesting image description");
  let request = backend.build_request(&encoded, config);
  let response = transport.post_json(request).await.map_err(|err| {
    error!(%provider, filename, media_type, error = %format!("{err:#}"), "Vision API request failed");
    ImageError::Provider {
      provider: provider.to_string(),
      filename: filename.to_string(),
      reason: format!("{err:#}"),
    }
  })?;

  let description = backend
    .extract_description(&response)
    .map(str::trim)
    .filter(|text| !text.is_empty())
    .unwrap_or(FALLBACK_DESCRIPTION);

  Ok(description.to_string())
}
