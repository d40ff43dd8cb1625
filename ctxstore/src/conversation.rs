//! `ConversationStore` — sessions, turns, flags, and system messages. The
//! scaffolding `ContextDataStore` doesn't own (§3.2 glossary), queried by
//! `TurnHistoryEnricher`, `FlagEnricher`, `PerceptionEnricher`, and the
//! pipeline's session/turn bookkeeping.

use async_trait::async_trait;
use ctxcore::{Flag, FlagId, PipelineResult, ProfileId, Session, SessionId, SystemMessage, SystemMessageType, Turn};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The profile's single active session, if any (§3.1).
    async fn get_active_session(&self, profile_id: ProfileId) -> PipelineResult<Option<Session>>;

    /// Accepted turns of a session, ordered by `(created_at, id)`.
    async fn get_accepted_turns(&self, session_id: SessionId) -> PipelineResult<Vec<Turn>>;

    /// Insert a new turn (the pipeline's placeholder row before dispatch).
    async fn persist_turn(&self, turn: &Turn) -> PipelineResult<()>;

    /// Overwrite a turn's mutable fields (`response`, `accepted`,
    /// `stripped_turn`) after dispatch completes.
    async fn update_turn(&self, turn: &Turn) -> PipelineResult<()>;

    /// `active OR constant` flags for a profile, newest-first by
    /// `(active desc, last_used_at ?? created_at desc)`.
    async fn get_injectable_flags(&self, profile_id: ProfileId) -> PipelineResult<Vec<Flag>>;

    /// Flip an active (one-shot) flag off and stamp `last_used_at`.
    async fn deactivate_flag(&self, id: FlagId, now: ctxcore::Timestamp) -> PipelineResult<()>;

    /// Stamp `last_used_at` on a constant flag without deactivating it.
    async fn stamp_flag_used(&self, id: FlagId, now: ctxcore::Timestamp) -> PipelineResult<()>;

    /// Active system messages of a type (`Persona`, `Perception`).
    async fn get_active_system_messages(
        &self,
        profile_id: ProfileId,
        message_type: SystemMessageType,
    ) -> PipelineResult<Vec<SystemMessage>>;

    /// A named `Technical` fragment, e.g. `"quote query transformer"`.
    async fn get_technical_message(&self, profile_id: ProfileId, name: &str) -> PipelineResult<Option<SystemMessage>>;
}
