//! `ProviderStrategy` (§4.8): a named dispatcher resolved from a setting,
//! with fallback-to-default-and-warn semantics for unknown names. Grounded
//! on the teacher's `ProviderRegistry` — round-robin index, health cache,
//! per-provider circuit breaker — generalized from provider *adapters* to
//! provider *strategies* that build a wire request and dispatch it through
//! the `LlmClient` capability trait rather than a vendor SDK.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ctxcore::{LlmProvider, PipelineError, PipelineResult};
use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::llm_client::LlmClient;
use crate::wire::{ClaudeContent, ClaudeMessage, ClaudeRequest, ClaudeThinking, ClaudeThinkingMode, GeminiContent, GeminiGenerationConfig, GeminiPart, GeminiRequest, GeminiSystemInstruction, GeminiThinkingConfig};

/// A single message in the provider-agnostic sequence the builder produces,
/// before it is rendered into either wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueMessage {
    pub role: DialogueRole,
    pub text: String,
    pub cache_breakpoint: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueRole {
    User,
    Assistant,
}

/// The provider-agnostic request the builder assembles; each `ProviderShape`
/// renders it into its own wire type, guaranteeing parity by construction
/// rather than via two independently maintained builders.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub system_instruction: String,
    pub messages: Vec<DialogueMessage>,
    pub max_output_tokens: i32,
    pub temperature: f32,
    pub enable_prompt_caching: bool,
    pub min_caching_content_length: usize,
}

impl ProviderRequest {
    pub fn to_gemini(&self) -> GeminiRequest {
        GeminiRequest {
            contents: self
                .messages
                .iter()
                .map(|m| GeminiContent {
                    role: match m.role {
                        DialogueRole::User => "user".to_string(),
                        DialogueRole::Assistant => "model".to_string(),
                    },
                    parts: vec![GeminiPart { text: m.text.clone() }],
                })
                .collect(),
            system_instruction: GeminiSystemInstruction {
                parts: vec![GeminiPart {
                    text: self.system_instruction.clone(),
                }],
            },
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
                response_mime_type: None,
                thinking_config: GeminiThinkingConfig { thinking_budget: None },
            },
            safety_settings: Vec::new(),
        }
    }

    pub fn to_claude(&self, model: impl Into<String>) -> ClaudeRequest {
        let should_cache = self.enable_prompt_caching && self.system_instruction.len() >= self.min_caching_content_length;
        let system = if should_cache {
            ClaudeContent::Blocks(vec![crate::wire::ClaudeTextBlock::new(self.system_instruction.clone())
                .with_cache_control(crate::wire::CacheControl::ephemeral())])
        } else {
            ClaudeContent::Text(self.system_instruction.clone())
        };

        ClaudeRequest {
            model: model.into(),
            max_tokens: self.max_output_tokens,
            temperature: Some(self.temperature),
            system,
            messages: self
                .messages
                .iter()
                .map(|m| ClaudeMessage {
                    role: match m.role {
                        DialogueRole::User => "user".to_string(),
                        DialogueRole::Assistant => "assistant".to_string(),
                    },
                    content: ClaudeContent::Text(m.text.clone()),
                })
                .collect(),
            top_p: None,
            top_k: None,
            stop_sequences: None,
            thinking: ClaudeThinking {
                mode: ClaudeThinkingMode::Adaptive,
                budget_tokens: None,
            },
        }
    }
}

/// Receives the state's pre-built provider-shaped request and returns
/// `(success, text)`.
#[async_trait]
pub trait ProviderStrategy: Send + Sync {
    fn provider(&self) -> LlmProvider;
    async fn dispatch(&self, request: &ProviderRequest, timeout: Duration) -> PipelineResult<(bool, String)>;
}

pub struct GeminiStrategy {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl GeminiStrategy {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

#[async_trait]
impl ProviderStrategy for GeminiStrategy {
    fn provider(&self) -> LlmProvider {
        LlmProvider::Gemini
    }

    async fn dispatch(&self, request: &ProviderRequest, timeout: Duration) -> PipelineResult<(bool, String)> {
        let wire = request.to_gemini();
        let payload = serde_json::to_string(&wire)
            .map_err(|e| PipelineError::MalformedResponse { source_name: self.model.clone(), reason: e.to_string() })?;
        let text = self.client.complete(&payload, timeout).await?;
        Ok((true, text))
    }
}

pub struct ClaudeStrategy {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl ClaudeStrategy {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

#[async_trait]
impl ProviderStrategy for ClaudeStrategy {
    fn provider(&self) -> LlmProvider {
        LlmProvider::Claude
    }

    async fn dispatch(&self, request: &ProviderRequest, timeout: Duration) -> PipelineResult<(bool, String)> {
        let wire = request.to_claude(self.model.clone());
        let payload = serde_json::to_string(&wire)
            .map_err(|e| PipelineError::MalformedResponse { source_name: self.model.clone(), reason: e.to_string() })?;
        let text = self.client.complete(&payload, timeout).await?;
        Ok((true, text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Trips after 5 consecutive failures, half-opens after 30s, closes again
/// after 3 consecutive successes — identical thresholds to the teacher's
/// `CircuitBreakerConfig::default()`.
struct CircuitBreaker {
    state: Mutex<CircuitState>,
    failures: AtomicU32,
    successes: AtomicU32,
    opened_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            state: Mutex::new(CircuitState::Closed),
            failures: AtomicU32::new(0),
            successes: AtomicU32::new(0),
            opened_at: RwLock::new(None),
        }
    }

    fn is_allowed(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let open_long_enough = self
                    .opened_at
                    .read()
                    .map(|t| t.elapsed() > Duration::from_secs(30))
                    .unwrap_or(false);
                if open_long_enough {
                    *state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        self.failures.store(0, Ordering::SeqCst);
        let mut state = self.state.lock();
        if *state == CircuitState::HalfOpen {
            let count = self.successes.fetch_add(1, Ordering::SeqCst) + 1;
            if count >= 3 {
                *state = CircuitState::Closed;
                self.successes.store(0, Ordering::SeqCst);
            }
        }
    }

    fn record_failure(&self) {
        self.successes.store(0, Ordering::SeqCst);
        let count = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= 5 {
            *self.state.lock() = CircuitState::Open;
            *self.opened_at.write() = Some(Instant::now());
        }
    }
}

/// Resolves the configured provider name to a concrete strategy, falling
/// back to `default_provider` (with a warning) when the name is unknown,
/// and failing fatally if the default is also unregistered.
pub struct ProviderRegistry {
    strategies: HashMap<LlmProvider, Arc<dyn ProviderStrategy>>,
    breakers: HashMap<LlmProvider, Arc<CircuitBreaker>>,
    default_provider: LlmProvider,
    round_robin: AtomicU32,
}

impl ProviderRegistry {
    pub fn new(default_provider: LlmProvider) -> Self {
        Self {
            strategies: HashMap::new(),
            breakers: HashMap::new(),
            default_provider,
            round_robin: AtomicU32::new(0),
        }
    }

    pub fn register(&mut self, strategy: Arc<dyn ProviderStrategy>) {
        let provider = strategy.provider();
        self.breakers.insert(provider, Arc::new(CircuitBreaker::new()));
        self.strategies.insert(provider, strategy);
    }

    fn resolve(&self, requested: LlmProvider) -> PipelineResult<Arc<dyn ProviderStrategy>> {
        if let Some(strategy) = self.strategies.get(&requested) {
            if self.breakers.get(&requested).map(|b| b.is_allowed()).unwrap_or(true) {
                return Ok(Arc::clone(strategy));
            }
        } else if requested != self.default_provider {
            warn!(requested = ?requested, "unknown provider, falling back to default");
        }

        self.strategies
            .get(&self.default_provider)
            .cloned()
            .ok_or_else(|| PipelineError::ProviderUnavailable {
                requested: format!("{:?}", requested),
            })
    }

    pub async fn dispatch(
        &self,
        requested: LlmProvider,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> PipelineResult<(bool, String)> {
        let strategy = self.resolve(requested)?;
        let provider = strategy.provider();
        let result = strategy.dispatch(request, timeout).await;
        if let Some(breaker) = self.breakers.get(&provider) {
            match &result {
                Ok(_) => breaker.record_success(),
                Err(_) => breaker.record_failure(),
            }
        }
        result
    }

    /// Round-robins across every currently-healthy registered strategy,
    /// ignoring `requested`. Used when the caller wants load distribution
    /// rather than a specific vendor.
    pub fn select_round_robin(&self) -> Option<LlmProvider> {
        let available: Vec<LlmProvider> = self
            .strategies
            .keys()
            .filter(|p| self.breakers.get(p).map(|b| b.is_allowed()).unwrap_or(true))
            .copied()
            .collect();
        if available.is_empty() {
            return None;
        }
        let idx = self.round_robin.fetch_add(1, Ordering::Relaxed) as usize % available.len();
        available.get(idx).copied()
    }
}
