//! The six type-specific enrichers that follow the §4.4 base pattern:
//! load `AlwaysOn` items for the enricher's type, then (if the type
//! supports it per the §3.1 validity table) active `Manual` items, adding
//! both to the matching bucket. `CharacterProfileEnricher` additionally
//! loads the single user profile first.

use async_trait::async_trait;
use ctxcore::ContentType;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::context::EnrichmentContext;
use crate::enricher::Enricher;

async fn load_always_on_and_manual(ctx: &EnrichmentContext<'_>, content_type: ContentType, supports_manual: bool) {
    let bucket = ctx.state.bucket_for(content_type);

    match ctx.store.get_always_on(ctx.state.profile_id, Some(content_type)).await {
        Ok(items) => {
            for item in items {
                bucket.insert(item);
            }
        }
        Err(err) => warn!(?content_type, %err, "failed to load always-on items"),
    }

    if !supports_manual {
        return;
    }

    match ctx.store.get_active_manual(ctx.state.profile_id, Some(content_type)).await {
        Ok(items) => {
            for item in items {
                bucket.insert(item);
            }
        }
        Err(err) => warn!(?content_type, %err, "failed to load active-manual items"),
    }
}

/// Loads the always-on/manual `CharacterProfile` entries, plus the single
/// user profile (setting `state.user_name` from its `name` field).
pub struct CharacterProfileEnricher;

#[async_trait]
impl Enricher for CharacterProfileEnricher {
    fn name(&self) -> &'static str {
        "CharacterProfileEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        match ctx.store.get_user_profile(ctx.state.profile_id).await {
            Ok(Some(profile)) => {
                *ctx.state.user_name.lock() = profile.name.clone();
                ctx.state.user_profile.insert(profile);
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "failed to load user profile"),
        }
        load_always_on_and_manual(ctx, ContentType::CharacterProfile, true).await;
    }
}

pub struct GenericDataEnricher;

#[async_trait]
impl Enricher for GenericDataEnricher {
    fn name(&self) -> &'static str {
        "GenericDataEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        load_always_on_and_manual(ctx, ContentType::Generic, true).await;
    }
}

pub struct QuoteEnricher;

#[async_trait]
impl Enricher for QuoteEnricher {
    fn name(&self) -> &'static str {
        "QuoteEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        load_always_on_and_manual(ctx, ContentType::Quote, true).await;
    }
}

pub struct MemoryDataEnricher;

#[async_trait]
impl Enricher for MemoryDataEnricher {
    fn name(&self) -> &'static str {
        "MemoryDataEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        load_always_on_and_manual(ctx, ContentType::Memory, true).await;
    }
}

pub struct InsightEnricher;

#[async_trait]
impl Enricher for InsightEnricher {
    fn name(&self) -> &'static str {
        "InsightEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        load_always_on_and_manual(ctx, ContentType::Insight, true).await;
    }
}

/// `PersonaVoiceSample` has no valid `Manual` availability (§3.1), so this
/// enricher only ever loads `AlwaysOn` items.
pub struct PersonaVoiceSampleEnricher;

#[async_trait]
impl Enricher for PersonaVoiceSampleEnricher {
    fn name(&self) -> &'static str {
        "PersonaVoiceSampleEnricher"
    }

    async fn enrich(&self, ctx: &EnrichmentContext<'_>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        load_always_on_and_manual(ctx, ContentType::PersonaVoiceSample, false).await;
    }
}
