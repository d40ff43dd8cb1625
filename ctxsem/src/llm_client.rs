//! `LlmClient` — the narrow capability trait `QueryTransformer`,
//! `PerceptionEnricher`, and `ProviderStrategy` all consume instead of
//! embedding a vendor SDK directly (§4.9 ambient addition). Only
//! `MockLlmClient`, with deterministic canned responses, ships here.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use ctxcore::{PipelineError, PipelineResult};
use parking_lot::Mutex;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// A free-form completion against `request`, bounded by `timeout`.
    async fn complete(&self, request: &str, timeout: Duration) -> PipelineResult<String>;

    /// A completion expected to return JSON, driven by a system/user
    /// instruction pair (used by `QueryTransformer` and `PerceptionEnricher`).
    async fn complete_json(&self, system: &str, user: &str) -> PipelineResult<String>;
}

/// Canned-response client keyed by system-instruction substring, falling
/// back to a default response. Deterministic so enricher/orchestrator
/// tests never depend on wall-clock or network state.
pub struct MockLlmClient {
    responses: Mutex<HashMap<String, String>>,
    default_response: String,
    fail_on: Mutex<Option<String>>,
}

impl MockLlmClient {
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default_response: default_response.into(),
            fail_on: Mutex::new(None),
        }
    }

    pub fn with_response(self, system_contains: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.lock().insert(system_contains.into(), response.into());
        self
    }

    /// Every subsequent call whose system instruction contains `needle`
    /// returns `UpstreamFailure` instead of a canned response.
    pub fn fail_when_system_contains(self, needle: impl Into<String>) -> Self {
        *self.fail_on.lock() = Some(needle.into());
        self
    }

    fn resolve(&self, system: &str) -> PipelineResult<String> {
        if let Some(needle) = self.fail_on.lock().as_ref() {
            if system.contains(needle.as_str()) {
                return Err(PipelineError::UpstreamFailure {
                    provider: "mock".to_string(),
                    message: "forced failure".to_string(),
                });
            }
        }
        let guard = self.responses.lock();
        for (needle, response) in guard.iter() {
            if system.contains(needle.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(self.default_response.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &str, _timeout: Duration) -> PipelineResult<String> {
        self.resolve(request)
    }

    async fn complete_json(&self, system: &str, _user: &str) -> PipelineResult<String> {
        self.resolve(system)
    }
}
