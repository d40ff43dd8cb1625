//! `FlagEnricher` — loads the active-or-constant flags for the profile into
//! `state.flags` (§4.4), already sorted newest-first.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context::EnrichmentContext;
use crate::enricher::Enricher;

pub struct FlagEnricher;

#[async_trait]
impl Enricher for FlagEnricher {
    fn name(&self) -> &'static str {
        "FlagEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        match ctx.conversation.get_injectable_flags(ctx.state.profile_id).await {
            Ok(flags) => *ctx.state.flags.lock() = flags,
            Err(err) => warn!(%err, "failed to load flags"),
        }
    }
}
