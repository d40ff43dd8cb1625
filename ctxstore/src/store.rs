//! `ContextDataStore` — the catalog of `ContextData` entries for a profile,
//! queried and mutated by type and availability (§4.1).

use async_trait::async_trait;
use ctxcore::{
    Availability, BatchResult, ContentType, ContextData, ContextDataId, PipelineError,
    PipelineResult, ProfileId, TurnId,
};

/// Operations the enrichment pipeline consumes. All mutations report
/// `NotFound` for unknown ids and `InvalidCombination` for invalid
/// (type, availability) pairs; storage errors propagate as-is.
#[async_trait]
pub trait ContextDataStore: Send + Sync {
    /// The unique user `CharacterProfile`, if one exists (§3.2 invariant 2).
    async fn get_user_profile(&self, profile_id: ProfileId) -> PipelineResult<Option<ContextData>>;

    /// `availability = AlwaysOn`, enabled, not archived, optionally filtered
    /// by type, ordered by `(type, sort_order)`. `sort_order` here is
    /// creation order, since no separate sort field is part of the model.
    async fn get_always_on(
        &self,
        profile_id: ProfileId,
        content_type: Option<ContentType>,
    ) -> PipelineResult<Vec<ContextData>>;

    /// `availability = Manual`, enabled, not archived, with
    /// `use_next_turn_only || use_every_turn`.
    async fn get_active_manual(
        &self,
        profile_id: ProfileId,
        content_type: Option<ContentType>,
    ) -> PipelineResult<Vec<ContextData>>;

    /// `availability = Trigger`, enabled, not archived, with non-empty
    /// `trigger_keywords`.
    async fn get_trigger_candidates(&self, profile_id: ProfileId) -> PipelineResult<Vec<ContextData>>;

    /// Flip a manual flag on, recording `previous_availability` if the item
    /// wasn't already `Manual`.
    async fn set_use_next_turn(&self, id: ContextDataId) -> PipelineResult<()>;

    async fn set_use_every_turn(&self, id: ContextDataId, on: bool) -> PipelineResult<()>;

    /// Clear both manual flags; if `previous_availability` is set, restore
    /// it and null the field.
    async fn clear_manual_flags(&self, id: ContextDataId) -> PipelineResult<()>;

    /// After a turn completes: every item whose `use_next_turn_only = true`
    /// has that flag reset and its availability restored from
    /// `previous_availability` (if any). Idempotent (§8 property 6).
    async fn process_post_turn(&self, profile_id: ProfileId) -> PipelineResult<()>;

    /// Validate via the §3.1 table; if leaving `Manual`, zero the manual
    /// flags and `previous_availability`.
    async fn change_availability(&self, id: ContextDataId, new: Availability) -> PipelineResult<()>;

    /// Increment `usage_count` and set `last_used_at` for each id, in one
    /// round trip.
    async fn record_usage(&self, ids: &[ContextDataId]) -> PipelineResult<()>;

    /// Stamp the turn an item fired or was selected on — used by
    /// `TriggerEnricher` after a candidate fires, and after selection more
    /// generally, so `used_last_on_turn_id`/cooldown bookkeeping stays
    /// current.
    async fn mark_used_on_turn(&self, id: ContextDataId, turn_id: TurnId) -> PipelineResult<()>;

    /// Bump `usage_count`/`trigger_count`/`last_triggered_at` for a firing
    /// trigger candidate (§4.3 step 5).
    async fn record_trigger_fired(&self, id: ContextDataId) -> PipelineResult<()>;

    /// Assign LLM-derived tags and a relevance score/reason, reporting a
    /// structured batch result (§7 mutation reporting policy).
    async fn apply_tags_and_relevance(
        &self,
        updates: &[(ContextDataId, Vec<String>, u8, Option<String>)],
    ) -> PipelineResult<BatchResult>;

    /// Fetch a single entry by id, for callers (e.g. semantic search
    /// dedup) that need the full record rather than a query result.
    async fn get(&self, id: ContextDataId) -> PipelineResult<Option<ContextData>>;

    /// All `availability = Semantic` entries not yet in the vector store —
    /// consumed by `SemanticService::sync_all` (§4.2).
    async fn get_unsynced_semantic(&self, profile_id: ProfileId) -> PipelineResult<Vec<ContextData>>;

    /// Stamp `vector_id`/`in_vector_db`/`embedding_updated_at` after a
    /// successful embed+upsert (§4.2 `EmbedAsync`).
    async fn mark_embedded(&self, id: ContextDataId, vector_id: String) -> PipelineResult<()>;
}

pub(crate) fn not_found(id: ContextDataId) -> PipelineError {
    PipelineError::context_data_not_found(id)
}
