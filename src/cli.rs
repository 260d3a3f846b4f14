//! Command-line interface definitions for confluence-ingest.
//!
//! Global options cover the Confluence connection, output behavior and
//! request pacing; each subcommand adds its own arguments.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use url::Url;

use crate::color::ColorScheme;
use crate::commands::content::handle_content_command;
use crate::commands::spaces::handle_spaces_command;
use crate::commands::version::handle_version_command;
use crate::credentials::Credential;
use crate::pipeline::{ContinuationPolicy, DEFAULT_PAGE_SIZE};
use crate::vision::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, VisionProvider};

/// confluence-ingest - Turn Confluence spaces into plain-text page records
#[derive(Debug, Parser)]
#[command(
  name = "confluence-ingest",
  version,
  about = "Turn Confluence spaces into plain-text page records",
  long_about = "Fetches every page of a Confluence space, converts the storage markup into\n\
                normalized plain text and emits one JSON record per page. Embedded images can\n\
                optionally be replaced by AI-generated descriptions in the plain text.",
  styles = get_clap_styles()
)]
pub struct Cli {
  /// Subcommand to execute
  #[command(subcommand)]
  pub command: Command,

  /// Authentication options
  #[command(flatten)]
  pub auth: AuthOptions,

  /// Behavior options
  #[command(flatten)]
  pub behavior: BehaviorOptions,

  /// Performance options
  #[command(flatten)]
  pub performance: PerformanceOptions,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Export the pages of a space as JSON records
  Content(ContentArgs),

  /// List the spaces visible to the configured user
  Spaces {
    /// Listing page size
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_name = "N")]
    page_size: usize,

    /// Write JSON to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },

  /// Display version and build information
  Version {
    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Show only version number
    #[arg(long)]
    short: bool,
  },
}

/// Arguments of the `content` subcommand.
#[derive(Debug, Args)]
pub struct ContentArgs {
  /// Space key, used for items without a `spaceKey` field
  #[arg(long, env = "CONFLUENCE_SPACE_KEY", value_name = "KEY")]
  pub space_key: Option<String>,

  /// Space display name for the provenance line, used for items without a
  /// `spaceName` field
  #[arg(long, value_name = "NAME", default_value = "")]
  pub space_name: String,

  /// JSON array of input items; without it a single empty item is processed
  #[arg(short, long, value_name = "FILE")]
  pub input: Option<PathBuf>,

  /// Write JSON to this file instead of stdout
  #[arg(short, long, value_name = "FILE")]
  pub output: Option<PathBuf>,

  /// Listing page size for pages and attachments
  #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_name = "N")]
  pub page_size: usize,

  /// What to do when an item fails
  #[arg(long, value_enum, default_value = "fail-fast", value_name = "POLICY")]
  pub on_error: ContinuationPolicy,

  /// Image description options
  #[command(flatten)]
  pub vision: VisionOptions,
}

/// Image description options
#[derive(Debug, Args)]
pub struct VisionOptions {
  /// Replace embedded images with AI-generated descriptions in the plain text
  #[arg(long)]
  pub describe_images: bool,

  /// Vision provider
  #[arg(long, value_enum, default_value = "openai", value_name = "PROVIDER")]
  pub vision_provider: VisionProvider,

  /// Vision provider API key
  #[arg(long, env = "VISION_API_KEY", value_name = "KEY", hide_env_values = true)]
  pub vision_api_key: Option<String>,

  /// Endpoint override (required for the custom provider)
  #[arg(long, value_name = "URL")]
  pub vision_api_url: Option<String>,

  /// Model override
  #[arg(long, value_name = "MODEL")]
  pub vision_model: Option<String>,

  /// Maximum tokens per description
  #[arg(long, default_value_t = DEFAULT_MAX_TOKENS, value_name = "N")]
  pub vision_max_tokens: u32,

  /// Sampling temperature
  #[arg(long, default_value_t = DEFAULT_TEMPERATURE, value_name = "T")]
  pub vision_temperature: f64,
}

/// Normalize a URL by adding https:// if no scheme is present
fn normalize_url(url: &str) -> Result<String, String> {
  let trimmed = url.trim();

  let parsed = match Url::parse(trimmed) {
    Ok(parsed) => parsed,
    Err(_) => {
      let with_https = format!("https://{trimmed}");
      Url::parse(&with_https).map_err(|e| format!("Invalid URL: {e}"))?
    }
  };

  let mut url_str = parsed.to_string();
  if url_str.ends_with('/') && url_str.len() > 1 {
    url_str.pop();
  }

  Ok(url_str)
}

/// Authentication options
#[derive(Debug, Parser)]
pub struct AuthOptions {
  /// Confluence base URL
  #[arg(long, env = "CONFLUENCE_URL", value_name = "URL", value_parser = normalize_url)]
  pub url: Option<String>,

  /// Confluence username
  #[arg(long, env = "CONFLUENCE_USER", value_name = "USER")]
  pub user: Option<String>,

  /// Confluence password or personal access token
  #[arg(long, env = "CONFLUENCE_PASSWORD", value_name = "PASSWORD", hide_env_values = true)]
  pub password: Option<String>,

  /// API gateway subscription key, sent as Ocp-Apim-Subscription-Key
  #[arg(long, env = "CONFLUENCE_SUBSCRIPTION_KEY", value_name = "KEY", hide_env_values = true)]
  pub subscription_key: Option<String>,
}

impl AuthOptions {
  pub fn credential(&self) -> Credential {
    Credential::new(self.user.clone(), self.password.clone(), self.subscription_key.clone())
  }
}

/// Behavior options
#[derive(Debug, Parser)]
pub struct BehaviorOptions {
  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  pub verbose: u8,

  /// Suppress all output except errors
  #[arg(short, long, conflicts_with = "verbose", global = true)]
  pub quiet: bool,

  /// Colorize output
  #[arg(long, value_enum, default_value = "auto", value_name = "WHEN", global = true)]
  pub color: ColorOption,
}

/// Color output options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
  Auto,
  Always,
  Never,
}

/// Performance options
#[derive(Debug, Parser)]
pub struct PerformanceOptions {
  /// Max requests per second against Confluence
  #[arg(long, default_value = "10", value_name = "N")]
  pub rate_limit: usize,

  /// Request timeout in seconds
  #[arg(long, default_value = "30", value_name = "SECONDS")]
  pub timeout: u64,
}

impl Cli {
  /// Validate CLI arguments
  ///
  /// Returns an error if the CLI configuration is invalid.
  pub fn validate(&self) -> Result<(), String> {
    let needs_url = !matches!(self.command, Command::Version { .. });
    if needs_url && self.auth.url.is_none() {
      return Err("--url (or CONFLUENCE_URL) is required".to_string());
    }

    if self.performance.rate_limit == 0 {
      return Err("--rate-limit must be at least 1 request per second".to_string());
    }

    let page_size = match &self.command {
      Command::Content(args) => Some(args.page_size),
      Command::Spaces { page_size, .. } => Some(*page_size),
      Command::Version { .. } => None,
    };
    if page_size == Some(0) {
      return Err("--page-size must be at least 1".to_string());
    }

    if let Command::Content(args) = &self.command
      && args.vision.describe_images
      && args.vision.vision_provider == VisionProvider::Custom
      && args.vision.vision_api_url.is_none()
    {
      return Err("--vision-api-url is required for the custom provider".to_string());
    }

    Ok(())
  }
}

/// Parse CLI arguments, initialize shared services, and dispatch to the chosen
/// command.
pub async fn run() {
  let cli = Cli::parse();

  init_tracing(&cli.behavior);

  let colors = ColorScheme::new(cli.behavior.color);

  if let Err(e) = cli.validate() {
    eprintln!("{} {}", colors.error("Error:"), e);
    process::exit(4); // Invalid arguments exit code
  }

  match &cli.command {
    Command::Content(args) => handle_content_command(args, &cli, &colors).await,
    Command::Spaces { page_size, output } => {
      handle_spaces_command(*page_size, output.as_deref(), &cli, &colors).await;
    }
    Command::Version { json, short } => handle_version_command(*json, *short, &colors),
  }
}

fn init_tracing(behavior: &BehaviorOptions) {
  let level = if behavior.quiet {
    LevelFilter::ERROR
  } else {
    match behavior.verbose {
      0 => LevelFilter::WARN,
      1 => LevelFilter::INFO,
      2 => LevelFilter::DEBUG,
      _ => LevelFilter::TRACE,
    }
  };

  let env_filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  let _ = tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .try_init();
}

/// Get custom styles for clap help output
fn get_clap_styles() -> clap::builder::Styles {
  use clap::builder::styling::{AnsiColor, Effects};

  clap::builder::Styles::styled()
    .header(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
    .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
    .literal(AnsiColor::BrightGreen.on_default())
    .placeholder(AnsiColor::BrightCyan.on_default())
    .error(AnsiColor::BrightRed.on_default() | Effects::BOLD)
    .valid(AnsiColor::BrightGreen.on_default())
    .invalid(AnsiColor::BrightRed.on_default())
}
