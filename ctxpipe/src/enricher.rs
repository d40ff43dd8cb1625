//! The `Enricher` trait every concrete enricher implements (§4.4): append
//! to `ConversationState`, never remove, and never propagate a failure —
//! log and continue.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::context::EnrichmentContext;

#[async_trait]
pub trait Enricher: Send + Sync {
    fn name(&self) -> &'static str;

    /// On cancellation, return promptly without finishing pending work.
    /// Cancellation is the one failure mode that propagates to the caller
    /// (via the orchestrator noticing the token is cancelled) rather than
    /// being swallowed.
    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken);
}
