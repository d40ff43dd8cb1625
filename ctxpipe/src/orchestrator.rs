//! `EnrichmentOrchestrator` (§4.5) — runs every enricher against one state
//! with two ordering constraints and otherwise unordered concurrency.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::context::EnrichmentContext;
use crate::enricher::Enricher;
use crate::flag_enricher::FlagEnricher;
use crate::perception_enricher::PerceptionEnricher;
use crate::semantic_enricher::SemanticDataEnricher;
use crate::trigger_enricher::TriggerEnricher;
use crate::turn_history_enricher::{DialogueLogEnricher, TurnHistoryEnricher};
use crate::type_enrichers::{
    CharacterProfileEnricher, GenericDataEnricher, InsightEnricher, MemoryDataEnricher,
    PersonaVoiceSampleEnricher, QuoteEnricher,
};

pub struct EnrichmentOrchestrator;

impl EnrichmentOrchestrator {
    /// Phase 1: `TurnHistoryEnricher` alone (populates `state.recent_turns`
    /// /`previous_turn`, which `DialogueLogEnricher`/`SemanticDataEnricher`
    /// /`TriggerEnricher` depend on).
    /// Phase 2a: `CharacterProfileEnricher` alone (populates
    /// `state.user_name`/`user_profile`, which `RequestBuilder` and
    /// `PerceptionEnricher` depend on).
    /// Phase 2b: every remaining enricher, concurrently.
    pub async fn run(ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        TurnHistoryEnricher.enrich(ctx, cancel).await;
        if cancel.is_cancelled() {
            return;
        }

        CharacterProfileEnricher.enrich(ctx, cancel).await;
        if cancel.is_cancelled() {
            return;
        }

        let enrichers: Vec<Arc<dyn Enricher>> = vec![
            Arc::new(GenericDataEnricher),
            Arc::new(QuoteEnricher),
            Arc::new(MemoryDataEnricher),
            Arc::new(InsightEnricher),
            Arc::new(PersonaVoiceSampleEnricher),
            Arc::new(TriggerEnricher),
            Arc::new(SemanticDataEnricher),
            Arc::new(FlagEnricher),
            Arc::new(DialogueLogEnricher),
            Arc::new(PerceptionEnricher),
        ];

        let tasks = enrichers.into_iter().map(|enricher| async move {
            enricher.enrich(ctx, cancel).await;
        });
        futures::future::join_all(tasks).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxcore::{ContentType, ConversationState, EntityIdType, PipelineConfig, ProfileId, Session, SessionId, Timestamp, Turn, TurnId};
    use ctxsem::{MockEmbeddingProvider, MockVectorStore, SemanticService};
    use ctxstore::{MockContextDataStore, MockConversationStore, TriggerEvaluator};

    fn now() -> Timestamp {
        Timestamp::from_timestamp(0, 0).unwrap()
    }

    #[tokio::test]
    async fn orchestrator_runs_to_completion_on_an_empty_store() {
        let profile_id = ProfileId::now_v7();
        let session = Session {
            id: SessionId::now_v7(),
            profile_id,
            name: "s".into(),
            is_active: true,
            created_at: now(),
        };
        let turn = Turn {
            id: TurnId::now_v7(),
            session_id: session.id,
            sequence: 1,
            input: "hello".into(),
            response: String::new(),
            stripped_turn: None,
            accepted: true,
            created_at: now(),
        };
        let state = ConversationState::new(profile_id, session, turn, "Persona".into());
        let store = MockContextDataStore::new();
        let conversation = MockConversationStore::new();
        let config = PipelineConfig::default_config();
        let semantic = SemanticService::new(Arc::new(MockEmbeddingProvider::new("m", 8)), Arc::new(MockVectorStore::new()));
        let trigger_evaluator = TriggerEvaluator::new("");
        let ctx = EnrichmentContext {
            state: &state,
            store: &store,
            conversation: &conversation,
            config: &config,
            semantic: &semantic,
            trigger_evaluator: &trigger_evaluator,
            llm_client: None,
            query_transformer: None,
            now: now(),
        };
        let cancel = CancellationToken::new();

        EnrichmentOrchestrator::run(&ctx, &cancel).await;

        assert_eq!(state.all_context_data_ids().len(), 0);
        assert!(state.flags.lock().is_empty());
        let _ = ContentType::Memory;
    }

    #[tokio::test]
    async fn cancellation_before_start_short_circuits_every_phase() {
        let profile_id = ProfileId::now_v7();
        let session = Session {
            id: SessionId::now_v7(),
            profile_id,
            name: "s".into(),
            is_active: true,
            created_at: now(),
        };
        let turn = Turn {
            id: TurnId::now_v7(),
            session_id: session.id,
            sequence: 1,
            input: "hello".into(),
            response: String::new(),
            stripped_turn: None,
            accepted: true,
            created_at: now(),
        };
        let state = ConversationState::new(profile_id, session, turn, "Persona".into());
        let store = MockContextDataStore::new();
        let conversation = MockConversationStore::new();
        let config = PipelineConfig::default_config();
        let semantic = SemanticService::new(Arc::new(MockEmbeddingProvider::new("m", 8)), Arc::new(MockVectorStore::new()));
        let trigger_evaluator = TriggerEvaluator::new("");
        let ctx = EnrichmentContext {
            state: &state,
            store: &store,
            conversation: &conversation,
            config: &config,
            semantic: &semantic,
            trigger_evaluator: &trigger_evaluator,
            llm_client: None,
            query_transformer: None,
            now: now(),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        EnrichmentOrchestrator::run(&ctx, &cancel).await;

        assert!(state.recent_turns.lock().is_empty());
    }
}
