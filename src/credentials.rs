//! Credentials for the Confluence REST API.
//!
//! Confluence Data Center deployments behind an API gateway expect HTTP Basic
//! authentication plus a gateway subscription key header. Both are optional
//! so anonymous instances and plain Basic auth keep working.

use std::fmt;

/// Header carrying the API gateway subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Represents a set of credentials for authenticating with a Confluence
/// instance.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
  /// The username for Basic authentication.
  pub username: Option<String>,
  /// The password or API token for Basic authentication.
  pub password: Option<String>,
  /// Optional API gateway subscription key.
  pub subscription_key: Option<String>,
}

impl Credential {
  pub fn new(username: Option<String>, password: Option<String>, subscription_key: Option<String>) -> Self {
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
    Self {
      username: non_empty(username),
      password: non_empty(password),
      subscription_key: non_empty(subscription_key),
    }
  }

  /// Whether Basic auth should be sent. A username alone is enough; the
  /// password then defaults to empty.
  pub fn has_basic_auth(&self) -> bool {
    self.username.is_some()
  }
}

// Keep secrets out of debug logs.
impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mask = |value: &Option<String>| value.as_ref().map(|_| "***");
    f.debug_struct("Credential")
      .field("username", &self.username)
      .field("password", &mask(&self.password))
      .field("subscription_key", &mask(&self.subscription_key))
      .finish()
  }
}
