//! `EnrichmentContext` — the bundle of shared collaborators every enricher
//! reads from. Plain references: the orchestrator drives every enricher to
//! completion within one `.await` tree, so nothing needs to outlive it.

use ctxcore::{ConversationState, PipelineConfig, Timestamp};
use ctxsem::{LlmClient, QueryTransformer, SemanticService};
use ctxstore::{ContextDataStore, ConversationStore, TriggerEvaluator};

pub struct EnrichmentContext<'a> {
    pub state: &'a ConversationState,
    pub store: &'a dyn ContextDataStore,
    pub conversation: &'a dyn ConversationStore,
    pub config: &'a PipelineConfig,
    pub semantic: &'a SemanticService,
    pub trigger_evaluator: &'a TriggerEvaluator,
    pub llm_client: Option<&'a dyn LlmClient>,
    pub query_transformer: Option<&'a dyn QueryTransformer>,
    pub now: Timestamp,
}
