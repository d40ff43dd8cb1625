//! `SemanticDataEnricher` (§4.4.1) — vector search across the four
//! semantic-capable types, deduplicated against every bucket already
//! populated and clamped to per-type quotas.

use std::collections::HashMap;

use async_trait::async_trait;
use ctxcore::ContentType;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context::EnrichmentContext;
use crate::enricher::Enricher;

fn per_type_limits(ctx: &EnrichmentContext<'_>) -> HashMap<ContentType, usize> {
    let quotas = &ctx.config.semantic_token_quotas;
    HashMap::from([
        (ContentType::Quote, quotas.quote as usize),
        (ContentType::Memory, quotas.memory as usize),
        (ContentType::Insight, quotas.insight as usize),
        (ContentType::PersonaVoiceSample, quotas.persona_voice_sample as usize),
    ])
}

pub struct SemanticDataEnricher;

#[async_trait]
impl Enricher for SemanticDataEnricher {
    fn name(&self) -> &'static str {
        "SemanticDataEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        if ctx.state.current_turn.input.trim().is_empty() {
            return;
        }
        let limits = per_type_limits(ctx);
        if limits.values().all(|&quota| quota == 0) {
            return;
        }

        let results = if ctx.config.semantic_use_llm_query_transformation {
            let Some(transformer) = ctx.query_transformer else {
                return;
            };
            let snippet = ctx
                .state
                .dialogue_log
                .lock()
                .clone()
                .unwrap_or_default();
            ctx.semantic
                .search_with_query_transformation(transformer, &ctx.state.current_turn.input, &snippet, &limits)
                .await
        } else {
            ctx.semantic.search_multi_type(&ctx.state.current_turn.input, &limits).await
        };

        let by_type = match results {
            Ok(results) => results,
            Err(err) => {
                warn!(%err, "semantic search failed");
                return;
            }
        };

        for (content_type, hits) in by_type {
            let quota = *limits.get(&content_type).unwrap_or(&0);
            if quota == 0 {
                continue;
            }
            let bucket = ctx.state.bucket_for(content_type);
            let mut cumulative = 0usize;
            for hit in hits {
                let Ok(id) = hit.payload_id.parse() else {
                    continue;
                };
                if ctx.state.contains_anywhere(id) {
                    continue;
                }
                let item = match ctx.store.get(id).await {
                    Ok(Some(item)) => item,
                    Ok(None) => continue,
                    Err(err) => {
                        warn!(%err, "failed to load semantic search hit");
                        continue;
                    }
                };
                let size = item.token_count.map(|t| t as usize).unwrap_or(item.content.len());
                if cumulative + size > quota {
                    break;
                }
                cumulative += size;
                bucket.insert(item);
            }
        }
    }
}
