//! Session, Turn, Flag, and SystemMessage — the conversational scaffolding
//! a profile's context data is assembled around.

use serde::{Deserialize, Serialize};

use crate::{FlagId, ProfileId, SessionId, SystemMessageId, Timestamp, TurnId};

/// An ordered sequence of turns belonging to one profile. At most one
/// session per profile is `active` (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub profile_id: ProfileId,
    pub name: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// A pair of `input`/`response`, plus a compressed projection used in
/// older-history logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub session_id: SessionId,
    /// 1-based position within the session; used for cooldown and ordering
    /// arithmetic that an opaque UUID can't carry.
    pub sequence: u64,
    pub input: String,
    pub response: String,
    /// A terse action/dialogue-only projection used for older-history
    /// compression (§4.4 DialogueLogEnricher). `None` until produced.
    pub stripped_turn: Option<String>,
    pub accepted: bool,
    pub created_at: Timestamp,
}

impl Turn {
    /// The text used by the dialogue-log compressor when no stripped
    /// projection is available.
    pub fn dialogue_log_text(&self) -> String {
        match &self.stripped_turn {
            Some(stripped) => stripped.clone(),
            None => format!("{}\n{}", self.input, self.response),
        }
    }
}

/// A short directive string injected into the outgoing prompt's trailing
/// section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub id: FlagId,
    pub profile_id: ProfileId,
    pub value: String,
    /// One-shot: deactivated after use.
    pub active: bool,
    /// Persistent: never deactivated by use.
    pub constant: bool,
    pub last_used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Flag {
    pub fn is_injectable(&self) -> bool {
        self.active || self.constant
    }
}

/// The category of a `SystemMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemMessageType {
    Persona,
    Perception,
    Technical,
}

/// Versioned text belonging to a profile. Personas drive the system
/// instruction block; perceptions drive the perception pass; technicals are
/// named prompt fragments addressable by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMessage {
    pub id: SystemMessageId,
    pub profile_id: ProfileId,
    pub message_type: SystemMessageType,
    pub name: Option<String>,
    pub content: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}
