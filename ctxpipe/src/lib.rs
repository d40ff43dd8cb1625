//! Enrichment orchestration, request building, and the end-to-end turn
//! pipeline for the context assembly engine.
//!
//! `ConversationState` (ctxcore) accumulates what a turn's context contains;
//! this crate owns the *how*: the nine enrichers that populate it, the
//! ordering constraints between them, the builder that renders it into a
//! provider-agnostic request, and the `Pipeline` that wires session lookup,
//! enrichment, dispatch, and post-turn bookkeeping into one call.

mod context;
mod enricher;
mod flag_enricher;
mod orchestrator;
mod perception_enricher;
mod pipeline;
mod request_builder;
mod semantic_enricher;
mod trigger_enricher;
mod turn_history_enricher;
mod type_enrichers;

pub use context::EnrichmentContext;
pub use enricher::Enricher;
pub use flag_enricher::FlagEnricher;
pub use orchestrator::EnrichmentOrchestrator;
pub use perception_enricher::PerceptionEnricher;
pub use pipeline::Pipeline;
pub use request_builder::RequestBuilder;
pub use semantic_enricher::SemanticDataEnricher;
pub use trigger_enricher::TriggerEnricher;
pub use turn_history_enricher::{DialogueLogEnricher, TurnHistoryEnricher};
pub use type_enrichers::{
    CharacterProfileEnricher, GenericDataEnricher, InsightEnricher, MemoryDataEnricher,
    PersonaVoiceSampleEnricher, QuoteEnricher,
};
