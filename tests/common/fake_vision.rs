//! Fake vision transport that records every call.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use confluence_ingest::vision::{ProviderRequest, VisionTransport};
use serde_json::Value;

use crate::common::fixtures;

/// Answers with scripted responses in order, then with a default.
pub struct FakeVision {
  script: Mutex<VecDeque<Result<Value, String>>>,
  default: Result<Value, String>,
  calls: Mutex<Vec<ProviderRequest>>,
}

impl FakeVision {
  /// Every call answers with an OpenAI-shaped response carrying `text`.
  pub fn describing(text: &str) -> Self {
    Self {
      script: Mutex::new(VecDeque::new()),
      default: Ok(fixtures::openai_answer(text)),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Every call fails like an HTTP error would.
  pub fn failing(reason: &str) -> Self {
    Self {
      script: Mutex::new(VecDeque::new()),
      default: Err(reason.to_string()),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Use `responses` for the first calls before falling back to the default.
  pub fn then(self, responses: Vec<Result<Value, String>>) -> Self {
    self.script.lock().unwrap().extend(responses);
    self
  }

  pub fn calls(&self) -> Vec<ProviderRequest> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }
}

#[async_trait]
impl VisionTransport for FakeVision {
  async fn post_json(&self, request: ProviderRequest) -> Result<Value> {
    self.calls.lock().unwrap().push(request);
    let next = self.script.lock().unwrap().pop_front();
    next.unwrap_or_else(|| self.default.clone()).map_err(|reason| anyhow!(reason))
  }
}
