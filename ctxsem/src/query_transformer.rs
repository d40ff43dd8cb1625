//! `QueryTransformer` (§4.7, optional): rewrites the current input into a
//! standalone retrieval query before semantic search, falling back to the
//! raw input on any failure.

use std::sync::Arc;

use async_trait::async_trait;
use ctxcore::PipelineResult;

use crate::llm_client::LlmClient;

/// The system instruction used to identify the query-transformer role,
/// matched against `MockLlmClient`'s canned-response table in tests.
pub const QUERY_TRANSFORMER_SYSTEM_MESSAGE: &str = "quote query transformer";

#[async_trait]
pub trait QueryTransformer: Send + Sync {
    async fn transform(&self, current_input: &str, context_snippet: &str) -> PipelineResult<String>;
}

pub struct LlmQueryTransformer {
    client: Arc<dyn LlmClient>,
}

impl LlmQueryTransformer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryTransformer for LlmQueryTransformer {
    async fn transform(&self, current_input: &str, context_snippet: &str) -> PipelineResult<String> {
        let user = format!("{}\n\n{}", context_snippet, current_input);
        let transformed = self.client.complete_json(QUERY_TRANSFORMER_SYSTEM_MESSAGE, &user).await?;
        let trimmed = transformed.trim();
        if trimmed.is_empty() {
            Ok(current_input.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }
}
