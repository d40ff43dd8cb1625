//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PipelineError, PipelineResult};

/// The LLM provider a `ProviderStrategy` dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LlmProvider {
    Gemini,
    Claude,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "Gemini",
            LlmProvider::Claude => "Claude",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gemini" => Ok(LlmProvider::Gemini),
            "Claude" => Ok(LlmProvider::Claude),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Per-type token quotas for the semantic retrieval sub-pipeline (§4.4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticTokenQuotas {
    pub quote: u32,
    pub memory: u32,
    pub insight: u32,
    pub persona_voice_sample: u32,
}

/// Retry configuration for LLM operations, reused verbatim across the
/// query transformer, perception calls, and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f32,
}

/// Master configuration struct. Every field is required — no implicit
/// defaults are baked into downstream components; `PipelineConfig::default_config()`
/// centralizes sane defaults so callers don't hardcode policy elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    // Provider dispatch (§6)
    pub llm_provider: LlmProvider,
    pub gemini_model: String,
    pub claude_model: String,

    // Semantic retrieval (§4.4.1, §6)
    pub semantic_use_llm_query_transformation: bool,
    pub semantic_token_quotas: SemanticTokenQuotas,

    // Perception (§4.4.2, §6)
    pub perception_enabled: bool,
    pub perception_parallelism: usize,

    // Trigger evaluation (§4.3, §6)
    pub trigger_scan_text_additional_words: String,

    // Request assembly (§4.6, §6)
    pub max_dialogue_log_turns: usize,
    pub previous_turns_count: usize,
    pub enable_prompt_caching: bool,
    pub min_caching_content_length: usize,
    pub max_output_tokens: i32,
    pub temperature: f32,

    // Ambient: retry/timeout policy (§5)
    pub llm_retry_config: RetryConfig,
    pub llm_request_timeout: Duration,
    pub batch_operation_timeout: Duration,
    pub batch_poll_interval: Duration,
}

impl PipelineConfig {
    /// Sane defaults matching the reference values named in §5/§6.
    pub fn default_config() -> Self {
        Self {
            llm_provider: LlmProvider::Gemini,
            gemini_model: "gemini-2.0-flash".to_string(),
            claude_model: "claude-sonnet-4".to_string(),
            semantic_use_llm_query_transformation: false,
            semantic_token_quotas: SemanticTokenQuotas {
                quote: 2000,
                memory: 2000,
                insight: 1000,
                persona_voice_sample: 1000,
            },
            perception_enabled: false,
            perception_parallelism: 5,
            trigger_scan_text_additional_words: String::new(),
            max_dialogue_log_turns: 20,
            previous_turns_count: 10,
            enable_prompt_caching: false,
            min_caching_content_length: 1024,
            max_output_tokens: 4096,
            temperature: 0.7,
            llm_retry_config: RetryConfig {
                max_retries: 3,
                initial_backoff: Duration::from_millis(100),
                max_backoff: Duration::from_secs(10),
                backoff_multiplier: 2.0,
            },
            llm_request_timeout: Duration::from_secs(5 * 60),
            batch_operation_timeout: Duration::from_secs(10 * 60),
            batch_poll_interval: Duration::from_secs(5),
        }
    }

    /// Overlay environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default_config();
        Self {
            llm_provider: std::env::var("CTX_LLM_PROVIDER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.llm_provider),
            gemini_model: std::env::var("CTX_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            claude_model: std::env::var("CTX_CLAUDE_MODEL").unwrap_or(defaults.claude_model),
            semantic_use_llm_query_transformation: std::env::var(
                "CTX_SEMANTIC_USE_LLM_QUERY_TRANSFORMATION",
            )
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.semantic_use_llm_query_transformation),
            perception_enabled: std::env::var("CTX_PERCEPTION_ENABLED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.perception_enabled),
            enable_prompt_caching: std::env::var("CTX_ENABLE_PROMPT_CACHING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.enable_prompt_caching),
            ..defaults
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.perception_parallelism == 0 {
            return Err(PipelineError::InvalidConfig {
                reason: "perception_parallelism must be greater than 0".into(),
            });
        }
        if self.llm_retry_config.backoff_multiplier <= 0.0 {
            return Err(PipelineError::InvalidConfig {
                reason: "backoff_multiplier must be positive".into(),
            });
        }
        if self.min_caching_content_length == 0 && self.enable_prompt_caching {
            return Err(PipelineError::InvalidConfig {
                reason: "min_caching_content_length must be positive when caching is enabled"
                    .into(),
            });
        }
        Ok(())
    }
}
