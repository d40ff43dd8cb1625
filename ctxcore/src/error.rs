//! Error types for context-engine operations.

use crate::{Availability, ContentType, ContextDataId, EntityIdType, ProfileId, SessionId};
use thiserror::Error;

/// The error kinds the core surfaces or swallows, per its error handling
/// design, plus `InvalidConfig` for construction-time configuration checks.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("invalid combination: type {content_type:?} is not valid with availability {availability:?}")]
    InvalidCombination {
        content_type: ContentType,
        availability: Availability,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("no active session for profile {profile_id}")]
    NoActiveSession { profile_id: ProfileId },

    #[error("provider unavailable: neither '{requested}' nor the default provider is registered")]
    ProviderUnavailable { requested: String },

    #[error("upstream failure from {provider}: {message}")]
    UpstreamFailure { provider: String, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("malformed response from {source_name}: {reason}")]
    MalformedResponse { source_name: String, reason: String },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        PipelineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn context_data_not_found(id: ContextDataId) -> Self {
        Self::not_found("context_data", id)
    }

    pub fn session_not_found(id: SessionId) -> Self {
        Self::not_found("session", id)
    }
}

/// Result alias for context-engine operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Structured report for a bulk mutation (tag generation, embedding, …).
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
    pub processed_items: Vec<ContextDataId>,
}

impl BatchResult {
    pub fn record_success(&mut self, id: ContextDataId) {
        self.success_count += 1;
        self.processed_items.push(id);
    }

    pub fn record_failure(&mut self, error: impl std::fmt::Display) {
        self.failed_count += 1;
        self.errors.push(error.to_string());
    }
}
