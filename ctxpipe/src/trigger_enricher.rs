//! `TriggerEnricher` — runs the keyword-trigger algorithm (§4.3) and routes
//! firing candidates into their typed buckets.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context::EnrichmentContext;
use crate::enricher::Enricher;

pub struct TriggerEnricher;

#[async_trait]
impl Enricher for TriggerEnricher {
    fn name(&self) -> &'static str {
        "TriggerEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }

        let candidates = match ctx.store.get_trigger_candidates(ctx.state.profile_id).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(%err, "failed to load trigger candidates");
                return;
            }
        };
        if candidates.is_empty() {
            return;
        }

        let max_lookback = ctxstore::TriggerEvaluator::max_lookback(&candidates);
        let turns = match ctx.conversation.get_accepted_turns(ctx.state.session.id).await {
            Ok(turns) => turns,
            Err(err) => {
                warn!(%err, "failed to load recent turns for trigger evaluation");
                return;
            }
        };
        let mut newest_first: Vec<_> = turns;
        newest_first.reverse();
        newest_first.truncate(max_lookback);

        let firings = ctx
            .trigger_evaluator
            .evaluate(candidates, &ctx.state.current_turn.input, &newest_first);

        for firing in firings {
            let content_type = firing.item.content_type;
            ctx.state.bucket_for(content_type).insert(firing.item.clone());
            if let Err(err) = ctx.store.record_trigger_fired(firing.item.id).await {
                warn!(%err, "failed to record trigger firing");
            }
        }
    }
}
