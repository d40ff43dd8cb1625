//! `TurnHistoryEnricher` and `DialogueLogEnricher` (§4.4). The former must
//! run first: it's the sole writer of `state.recent_turns`/`previous_turn`,
//! which the latter (and `SemanticDataEnricher`/`TriggerEnricher`) read.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context::EnrichmentContext;
use crate::enricher::Enricher;

pub struct TurnHistoryEnricher;

#[async_trait]
impl Enricher for TurnHistoryEnricher {
    fn name(&self) -> &'static str {
        "TurnHistoryEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        let turns = match ctx.conversation.get_accepted_turns(ctx.state.session.id).await {
            Ok(turns) => turns,
            Err(err) => {
                warn!(%err, "failed to load turn history");
                return;
            }
        };

        let recent: Vec<_> = turns
            .iter()
            .rev()
            .take(ctx.config.previous_turns_count)
            .rev()
            .cloned()
            .collect();
        *ctx.state.previous_turn.lock() = recent.last().cloned();
        *ctx.state.recent_turns.lock() = recent;
    }
}

/// Compresses turns older than the recent window into a single log string.
pub struct DialogueLogEnricher;

#[async_trait]
impl Enricher for DialogueLogEnricher {
    fn name(&self) -> &'static str {
        "DialogueLogEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        let all_turns = match ctx.conversation.get_accepted_turns(ctx.state.session.id).await {
            Ok(turns) => turns,
            Err(err) => {
                warn!(%err, "failed to load turn history for dialogue log");
                return;
            }
        };

        let recent_count = ctx.config.previous_turns_count.min(all_turns.len());
        let older_count = all_turns.len() - recent_count;
        if older_count == 0 {
            return;
        }
        let older = &all_turns[..older_count];

        let kept_count = ctx.config.max_dialogue_log_turns.min(older.len());
        let truncated_count = older.len() - kept_count;
        let kept = &older[truncated_count..];

        let mut log = String::new();
        if truncated_count > 0 {
            log.push_str(&format!("(truncated {truncated_count} earlier turns)\n"));
        }
        for turn in kept {
            log.push_str(&turn.dialogue_log_text());
            log.push('\n');
        }

        *ctx.state.dialogue_log.lock() = Some(log.trim_end().to_string());
    }
}
