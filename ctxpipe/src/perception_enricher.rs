//! `PerceptionEnricher` (§4.4.2) — one bounded-parallel LLM call per active
//! `Perception` system message, each producing structured `{property,
//! explanation}` annotations of the current input.

use async_trait::async_trait;
use ctxcore::{Perception, SystemMessageType};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context::EnrichmentContext;
use crate::enricher::Enricher;

#[derive(Debug, Deserialize)]
struct RawPerception {
    property: String,
    explanation: String,
}

/// Finds the outermost `[...]` substring and parses it as a JSON array of
/// `{property, explanation}`. Malformed items are skipped; a malformed (or
/// absent) array yields no perceptions.
fn parse_perceptions(response: &str) -> Vec<Perception> {
    let start = match response.find('[') {
        Some(i) => i,
        None => return Vec::new(),
    };
    let end = match response.rfind(']') {
        Some(i) if i >= start => i,
        _ => return Vec::new(),
    };
    let slice = &response[start..=end];
    let raw: Vec<serde_json::Value> = match serde_json::from_str(slice) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    raw.into_iter()
        .filter_map(|v| serde_json::from_value::<RawPerception>(v).ok())
        .map(|r| Perception {
            property: r.property,
            explanation: r.explanation,
        })
        .collect()
}

pub struct PerceptionEnricher;

#[async_trait]
impl Enricher for PerceptionEnricher {
    fn name(&self) -> &'static str {
        "PerceptionEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        if !ctx.config.perception_enabled || ctx.state.current_turn.input.trim().is_empty() {
            return;
        }
        let Some(client) = ctx.llm_client else {
            return;
        };

        let messages = match ctx
            .conversation
            .get_active_system_messages(ctx.state.profile_id, SystemMessageType::Perception)
            .await
        {
            Ok(messages) => messages,
            Err(err) => {
                warn!(%err, "failed to load perception system messages");
                return;
            }
        };
        if messages.is_empty() {
            return;
        }

        let previous_response = ctx
            .state
            .previous_turn
            .lock()
            .as_ref()
            .map(|t| t.response.clone())
            .unwrap_or_default();
        let user_message = format!("{}\n{}", previous_response, ctx.state.current_turn.input);

        let semaphore = Arc::new(Semaphore::new(ctx.config.perception_parallelism));
        let mut tasks = Vec::new();
        for message in messages {
            if cancel.is_cancelled() {
                return;
            }
            let semaphore = Arc::clone(&semaphore);
            let user_message = user_message.clone();
            tasks.push(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                client.complete_json(&message.content, &user_message).await
            });
        }

        let results = futures::future::join_all(tasks).await;
        if cancel.is_cancelled() {
            return;
        }

        let mut perceptions = Vec::new();
        for result in results {
            match result {
                Ok(response) => perceptions.extend(parse_perceptions(&response)),
                Err(err) => warn!(%err, "perception call failed"),
            }
        }
        *ctx.state.perceptions.lock() = perceptions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxcore::{ConversationState, EntityIdType, PipelineConfig, ProfileId, Session, SessionId, SystemMessage, SystemMessageId, Timestamp, Turn, TurnId};
    use ctxsem::{MockEmbeddingProvider, MockLlmClient, MockVectorStore, SemanticService};
    use ctxstore::{MockContextDataStore, MockConversationStore, TriggerEvaluator};

    fn now() -> Timestamp {
        Timestamp::from_timestamp(0, 0).unwrap()
    }

    #[test]
    fn parses_outermost_array_ignoring_surrounding_prose() {
        let response = r#"here you go: [{"property":"exploration.desire:true","explanation":"curious"}] thanks"#;
        let parsed = parse_perceptions(response);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].property, "exploration.desire:true");
    }

    #[test]
    fn malformed_array_yields_no_perceptions() {
        assert!(parse_perceptions("not an array at all").is_empty());
        assert!(parse_perceptions("[{\"property\": }]").is_empty());
    }

    #[test]
    fn malformed_items_are_skipped_not_fatal() {
        let response = r#"[{"property":"a","explanation":"b"},{"bogus":true}]"#;
        let parsed = parse_perceptions(response);
        assert_eq!(parsed.len(), 1);
    }

    #[tokio::test]
    async fn disabled_perception_produces_no_llm_calls() {
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
        conversation
            .insert_system_message(SystemMessage {
                id: SystemMessageId::now_v7(),
                profile_id,
                message_type: SystemMessageType::Perception,
                name: None,
                content: "notice complaints".into(),
                is_active: true,
                created_at: now(),
            })
            .await;
        let mut config = PipelineConfig::default_config();
        config.perception_enabled = false;
        let semantic = SemanticService::new(Arc::new(MockEmbeddingProvider::new("m", 8)), Arc::new(MockVectorStore::new()));
        let client = MockLlmClient::new("[]");
        let trigger_evaluator = TriggerEvaluator::new("");
        let ctx = EnrichmentContext {
            state: &state,
            store: &store,
            conversation: &conversation,
            config: &config,
            semantic: &semantic,
            trigger_evaluator: &trigger_evaluator,
            llm_client: Some(&client),
            query_transformer: None,
            now: now(),
        };
        let cancel = CancellationToken::new();

        PerceptionEnricher.enrich(&ctx, &cancel).await;

        assert!(state.perceptions.lock().is_empty());
    }

    #[tokio::test]
    async fn enabled_perception_collects_results_from_every_active_message() {
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
            input: "I love photography".into(),
            response: String::new(),
            stripped_turn: None,
            accepted: true,
            created_at: now(),
        };
        let state = ConversationState::new(profile_id, session, turn, "Persona".into());
        let store = MockContextDataStore::new();
        let conversation = MockConversationStore::new();
        conversation
            .insert_system_message(SystemMessage {
                id: SystemMessageId::now_v7(),
                profile_id,
                message_type: SystemMessageType::Perception,
                name: None,
                content: "notice exploration".into(),
                is_active: true,
                created_at: now(),
            })
            .await;
        let mut config = PipelineConfig::default_config();
        config.perception_enabled = true;
        let semantic = SemanticService::new(Arc::new(MockEmbeddingProvider::new("m", 8)), Arc::new(MockVectorStore::new()));
        let client = MockLlmClient::new(
            r#"[{"property":"exploration.desire:true","explanation":"wants more"},{"property":"exploration.topic:photography","explanation":"topic"}]"#,
        );
        let trigger_evaluator = TriggerEvaluator::new("");
        let ctx = EnrichmentContext {
            state: &state,
            store: &store,
            conversation: &conversation,
            config: &config,
            semantic: &semantic,
            trigger_evaluator: &trigger_evaluator,
            llm_client: Some(&client),
            query_transformer: None,
            now: now(),
        };
        let cancel = CancellationToken::new();

        PerceptionEnricher.enrich(&ctx, &cancel).await;

        assert_eq!(state.perceptions.lock().len(), 2);
    }
}
