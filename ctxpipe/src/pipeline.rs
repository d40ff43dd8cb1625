//! `Pipeline` (§4.9) — the end-to-end turn lifecycle: locate the active
//! session, persist a placeholder turn, enrich, build the request, dispatch,
//! then record the outcome and usage best-effort.

use ctxcore::{EntityIdType, LlmProvider, PipelineConfig, PipelineError, PipelineResult, ProfileId, Turn, TurnId};
use ctxsem::{ProviderRegistry, SemanticService};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context::EnrichmentContext;
use crate::orchestrator::EnrichmentOrchestrator;
use crate::request_builder::RequestBuilder;
use ctxsem::{LlmClient, QueryTransformer};
use ctxstore::{ContextDataStore, ConversationStore, TriggerEvaluator};

pub struct Pipeline<'a> {
    pub store: &'a dyn ContextDataStore,
    pub conversation: &'a dyn ConversationStore,
    pub config: &'a PipelineConfig,
    pub semantic: &'a SemanticService,
    pub trigger_evaluator: &'a TriggerEvaluator,
    pub providers: &'a ProviderRegistry,
    pub llm_client: Option<&'a dyn LlmClient>,
    pub query_transformer: Option<&'a dyn QueryTransformer>,
}

impl<'a> Pipeline<'a> {
    /// Runs one turn to completion. `persona_content` is the active
    /// `Persona` system message's text, if any; `is_ooc_request` and
    /// `now` are supplied by the caller (the bot/API layer) since they
    /// depend on transport-level parsing and wall-clock time the pipeline
    /// itself has no access to.
    pub async fn process_input(
        &self,
        profile_id: ProfileId,
        input: String,
        persona_name: String,
        persona_content: Option<String>,
        is_ooc_request: bool,
        now: ctxcore::Timestamp,
        cancel: &CancellationToken,
    ) -> PipelineResult<Turn> {
        // 1. Locate the active session.
        let session = self
            .conversation
            .get_active_session(profile_id)
            .await?
            .ok_or(PipelineError::NoActiveSession { profile_id })?;

        // 2. Construct and persist a placeholder turn.
        let accepted_so_far = self.conversation.get_accepted_turns(session.id).await?;
        let mut turn = Turn {
            id: TurnId::now_v7(),
            session_id: session.id,
            sequence: accepted_so_far.len() as u64 + 1,
            input,
            response: String::new(),
            stripped_turn: None,
            accepted: false,
            created_at: now,
        };
        self.conversation.persist_turn(&turn).await?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // 3. Build the conversation state.
        let mut state = ctxcore::ConversationState::new(profile_id, session.clone(), turn.clone(), persona_name);
        *state.persona_content.lock() = persona_content;
        state.is_ooc_request = is_ooc_request;

        let ctx = EnrichmentContext {
            state: &state,
            store: self.store,
            conversation: self.conversation,
            config: self.config,
            semantic: self.semantic,
            trigger_evaluator: self.trigger_evaluator,
            llm_client: self.llm_client,
            query_transformer: self.query_transformer,
            now,
        };

        // 4. Run the enrichment orchestrator.
        EnrichmentOrchestrator::run(&ctx, cancel).await;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // 5. Build the provider request.
        let request = RequestBuilder::build(&ctx).await;

        // 6. Dispatch.
        let dispatch_result = self
            .providers
            .dispatch(self.config.llm_provider, &request, self.config.llm_request_timeout)
            .await;
        match dispatch_result {
            Ok((success, text)) => {
                turn.response = text;
                turn.accepted = success;
            }
            Err(err) => {
                turn.response = err.to_string();
                turn.accepted = false;
            }
        }
        if let Err(err) = self.conversation.update_turn(&turn).await {
            warn!(%err, "failed to persist turn outcome");
        }

        // 7. Best-effort post-turn bookkeeping.
        if let Err(err) = self.store.process_post_turn(profile_id).await {
            warn!(%err, "process_post_turn failed");
        }
        let ids = state.all_context_data_ids();
        if let Err(err) = self.store.record_usage(&ids).await {
            warn!(%err, "record_usage failed");
        }

        // 8. Return the turn.
        Ok(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxcore::{Session, SessionId};
    use ctxsem::{GeminiStrategy, MockEmbeddingProvider, MockLlmClient, MockVectorStore};
    use ctxstore::{MockContextDataStore, MockConversationStore};
    use std::sync::Arc;

    fn now() -> ctxcore::Timestamp {
        ctxcore::Timestamp::from_timestamp(0, 0).unwrap()
    }

    #[tokio::test]
    async fn fails_without_an_active_session() {
        let store = MockContextDataStore::new();
        let conversation = MockConversationStore::new();
        let config = PipelineConfig::default_config();
        let semantic = SemanticService::new(Arc::new(MockEmbeddingProvider::new("m", 8)), Arc::new(MockVectorStore::new()));
        let trigger_evaluator = TriggerEvaluator::new("");
        let providers = ProviderRegistry::new(LlmProvider::Gemini);
        let pipeline = Pipeline {
            store: &store,
            conversation: &conversation,
            config: &config,
            semantic: &semantic,
            trigger_evaluator: &trigger_evaluator,
            providers: &providers,
            llm_client: None,
            query_transformer: None,
        };
        let cancel = CancellationToken::new();

        let result = pipeline
            .process_input(ProfileId::now_v7(), "hi".into(), "Persona".into(), None, false, now(), &cancel)
            .await;

        assert!(matches!(result, Err(PipelineError::NoActiveSession { .. })));
    }

    #[tokio::test]
    async fn successful_dispatch_marks_turn_accepted() {
        let store = MockContextDataStore::new();
        let conversation = MockConversationStore::new();
        let profile_id = ProfileId::now_v7();
        let session = Session {
            id: SessionId::now_v7(),
            profile_id,
            name: "s".into(),
            is_active: true,
            created_at: now(),
        };
        conversation.insert_session(session).await;

        let config = PipelineConfig::default_config();
        let semantic = SemanticService::new(Arc::new(MockEmbeddingProvider::new("m", 8)), Arc::new(MockVectorStore::new()));
        let trigger_evaluator = TriggerEvaluator::new("");
        let mut providers = ProviderRegistry::new(LlmProvider::Gemini);
        providers.register(Arc::new(GeminiStrategy::new(Arc::new(MockLlmClient::new("hello back")), "gemini-model")));
        let pipeline = Pipeline {
            store: &store,
            conversation: &conversation,
            config: &config,
            semantic: &semantic,
            trigger_evaluator: &trigger_evaluator,
            providers: &providers,
            llm_client: None,
            query_transformer: None,
        };
        let cancel = CancellationToken::new();

        let turn = pipeline
            .process_input(profile_id, "hi".into(), "Persona".into(), None, false, now(), &cancel)
            .await
            .unwrap();

        assert!(turn.accepted);
        assert_eq!(turn.response, "hello back");
    }

    #[tokio::test]
    async fn provider_failure_records_rejected_turn() {
        let store = MockContextDataStore::new();
        let conversation = MockConversationStore::new();
        let profile_id = ProfileId::now_v7();
        let session = Session {
            id: SessionId::now_v7(),
            profile_id,
            name: "s".into(),
            is_active: true,
            created_at: now(),
        };
        conversation.insert_session(session).await;

        let config = PipelineConfig::default_config();
        let semantic = SemanticService::new(Arc::new(MockEmbeddingProvider::new("m", 8)), Arc::new(MockVectorStore::new()));
        let trigger_evaluator = TriggerEvaluator::new("");
        // No strategies registered at all: dispatch fails with ProviderUnavailable.
        let providers = ProviderRegistry::new(LlmProvider::Gemini);
        let pipeline = Pipeline {
            store: &store,
            conversation: &conversation,
            config: &config,
            semantic: &semantic,
            trigger_evaluator: &trigger_evaluator,
            providers: &providers,
            llm_client: None,
            query_transformer: None,
        };
        let cancel = CancellationToken::new();

        let turn = pipeline
            .process_input(profile_id, "hi".into(), "Persona".into(), None, false, now(), &cancel)
            .await
            .unwrap();

        assert!(!turn.accepted);
        assert!(!turn.response.is_empty());
    }
}
