//! Color utilities for terminal output
//!
//! Progress and summaries go to stderr (stdout carries JSON), so automatic
//! color detection looks at stderr.

use std::fmt::Display;

use owo_colors::{OwoColorize, Style};

use crate::cli::ColorOption;

/// Semantic styles for human-facing output.
pub struct ColorScheme {
  enabled: bool,
}

impl ColorScheme {
  /// Create a color scheme from the user preference and terminal
  /// capabilities
  pub fn new(color_option: ColorOption) -> Self {
    let enabled = match color_option {
      ColorOption::Always => true,
      ColorOption::Never => false,
      ColorOption::Auto => {
        use std::io::IsTerminal;
        std::io::stderr().is_terminal()
      }
    };

    Self { enabled }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn paint<T: Display>(&self, text: T, style: Style) -> String {
    if self.enabled {
      format!("{}", text.style(style))
    } else {
      text.to_string()
    }
  }

  /// Success markers and summaries (green)
  pub fn success<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().green())
  }

  /// Errors (bright red, bold)
  pub fn error<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_red().bold())
  }

  /// Warnings such as failed items (yellow)
  pub fn warning<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().yellow())
  }

  pub fn info<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().cyan())
  }

  /// Labels and names (bright white, bold)
  pub fn emphasis<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_white().bold())
  }

  pub fn link<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().blue().underline())
  }

  pub fn path<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().magenta())
  }

  pub fn number<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_blue())
  }

  /// Identifiers such as provider names and commit hashes (bright green)
  pub fn code<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_green())
  }

  pub fn dimmed<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().dimmed())
  }

  /// Progress arrows (bright cyan)
  pub fn progress<T: Display>(&self, text: T) -> String {
    self.paint(text, Style::new().bright_cyan())
  }
}
