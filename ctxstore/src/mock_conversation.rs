//! In-memory `ConversationStore`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ctxcore::{
    EntityIdType, Flag, FlagId, PipelineError, PipelineResult, ProfileId, Session, SessionId,
    SystemMessage, SystemMessageType, Timestamp, Turn, TurnId,
};
use tokio::sync::RwLock;

use crate::conversation::ConversationStore;

#[derive(Debug, Default)]
pub struct MockConversationStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    turns: Arc<RwLock<HashMap<TurnId, Turn>>>,
    flags: Arc<RwLock<HashMap<FlagId, Flag>>>,
    system_messages: Arc<RwLock<HashMap<ctxcore::SystemMessageId, SystemMessage>>>,
}

impl MockConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_session(&self, session: Session) {
        self.sessions.write().await.insert(session.id, session);
    }

    pub async fn insert_turn(&self, turn: Turn) {
        self.turns.write().await.insert(turn.id, turn);
    }

    pub async fn insert_flag(&self, flag: Flag) {
        self.flags.write().await.insert(flag.id, flag);
    }

    pub async fn insert_system_message(&self, message: SystemMessage) {
        self.system_messages.write().await.insert(message.id, message);
    }
}

#[async_trait]
impl ConversationStore for MockConversationStore {
    async fn get_active_session(&self, profile_id: ProfileId) -> PipelineResult<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.profile_id == profile_id && s.is_active)
            .cloned())
    }

    async fn get_accepted_turns(&self, session_id: SessionId) -> PipelineResult<Vec<Turn>> {
        let mut turns: Vec<Turn> = self
            .turns
            .read()
            .await
            .values()
            .filter(|t| t.session_id == session_id && t.accepted)
            .cloned()
            .collect();
        turns.sort_by_key(|t| (t.created_at, t.id));
        Ok(turns)
    }

    async fn persist_turn(&self, turn: &Turn) -> PipelineResult<()> {
        self.turns.write().await.insert(turn.id, turn.clone());
        Ok(())
    }

    async fn update_turn(&self, turn: &Turn) -> PipelineResult<()> {
        let mut turns = self.turns.write().await;
        if !turns.contains_key(&turn.id) {
            return Err(PipelineError::NotFound {
                entity: "turn",
                id: turn.id.to_string(),
            });
        }
        turns.insert(turn.id, turn.clone());
        Ok(())
    }

    async fn get_injectable_flags(&self, profile_id: ProfileId) -> PipelineResult<Vec<Flag>> {
        let mut flags: Vec<Flag> = self
            .flags
            .read()
            .await
            .values()
            .filter(|f| f.profile_id == profile_id && f.is_injectable())
            .cloned()
            .collect();
        flags.sort_by(|a, b| {
            b.active
                .cmp(&a.active)
                .then_with(|| b.last_used_at.unwrap_or(b.created_at).cmp(&a.last_used_at.unwrap_or(a.created_at)))
        });
        Ok(flags)
    }

    async fn deactivate_flag(&self, id: FlagId, now: Timestamp) -> PipelineResult<()> {
        let mut flags = self.flags.write().await;
        let flag = flags.get_mut(&id).ok_or_else(|| PipelineError::NotFound {
            entity: "flag",
            id: id.to_string(),
        })?;
        flag.active = false;
        flag.last_used_at = Some(now);
        Ok(())
    }

    async fn stamp_flag_used(&self, id: FlagId, now: Timestamp) -> PipelineResult<()> {
        let mut flags = self.flags.write().await;
        let flag = flags.get_mut(&id).ok_or_else(|| PipelineError::NotFound {
            entity: "flag",
            id: id.to_string(),
        })?;
        flag.last_used_at = Some(now);
        Ok(())
    }

    async fn get_active_system_messages(
        &self,
        profile_id: ProfileId,
        message_type: SystemMessageType,
    ) -> PipelineResult<Vec<SystemMessage>> {
        Ok(self
            .system_messages
            .read()
            .await
            .values()
            .filter(|m| m.profile_id == profile_id && m.message_type == message_type && m.is_active)
            .cloned()
            .collect())
    }

    async fn get_technical_message(&self, profile_id: ProfileId, name: &str) -> PipelineResult<Option<SystemMessage>> {
        Ok(self
            .system_messages
            .read()
            .await
            .values()
            .find(|m| {
                m.profile_id == profile_id
                    && m.message_type == SystemMessageType::Technical
                    && m.is_active
                    && m.name.as_deref() == Some(name)
            })
            .cloned())
    }
}
