//! Semantic index, provider wire shapes, and capability traits at the §1
//! vendor boundary: `EmbeddingProvider`, `VectorStore`, and `LlmClient` are
//! narrow async traits the rest of the workspace depends on; only
//! deterministic mocks are shipped, since real vendor HTTP clients are out
//! of scope.

pub mod embedding;
pub mod llm_client;
pub mod provider_strategy;
pub mod query_transformer;
pub mod semantic;
pub mod vector_store;
pub mod wire;

pub use embedding::{EmbeddingProvider, MockEmbeddingProvider};
pub use llm_client::{LlmClient, MockLlmClient};
pub use provider_strategy::{ClaudeStrategy, DialogueMessage, DialogueRole, GeminiStrategy, ProviderRegistry, ProviderRequest, ProviderStrategy};
pub use query_transformer::{LlmQueryTransformer, QueryTransformer, QUERY_TRANSFORMER_SYSTEM_MESSAGE};
pub use semantic::{SemanticService, SYNC_BATCH_SIZE};
pub use vector_store::{MockVectorStore, SearchHit, VectorStore, DEFAULT_DIMENSIONS};
