//! The context-data model: a polymorphic content record scoped to a profile,
//! its availability mechanisms, and the type×availability validity table.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{ContextDataId, PipelineError, PipelineResult, ProfileId, SessionId, Timestamp, TurnId};

/// What kind of content a `ContextData` entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Quote,
    PersonaVoiceSample,
    Memory,
    Insight,
    CharacterProfile,
    Generic,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Quote => "quote",
            ContentType::PersonaVoiceSample => "personavoicesample",
            ContentType::Memory => "memory",
            ContentType::Insight => "insight",
            ContentType::CharacterProfile => "characterprofile",
            ContentType::Generic => "generic",
        }
    }
}

/// The mechanism by which a `ContextData` entry becomes part of a turn's
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    AlwaysOn,
    Manual,
    Semantic,
    Trigger,
    Archive,
}

impl Availability {
    /// The type×availability validity table (§3.1). Any combination not
    /// listed here is rejected with `InvalidCombination`.
    pub fn is_valid_for(&self, content_type: ContentType) -> bool {
        use Availability::*;
        use ContentType::*;
        match (content_type, self) {
            (Quote, AlwaysOn | Manual | Semantic | Archive) => true,
            (Quote, Trigger) => false,
            (PersonaVoiceSample, AlwaysOn | Semantic | Archive) => true,
            (PersonaVoiceSample, Manual | Trigger) => false,
            (Memory, _) | (Insight, _) => true,
            (CharacterProfile, AlwaysOn | Manual | Trigger | Archive) => true,
            (CharacterProfile, Semantic) => false,
            (Generic, AlwaysOn | Manual | Trigger | Archive) => true,
            (Generic, Semantic) => false,
        }
    }
}

/// Which of the three content bodies is rendered into the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayMode {
    Content,
    Summary,
    CoreFacts,
}

/// A polymorphic content record scoped to a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextData {
    pub id: ContextDataId,
    pub profile_id: ProfileId,
    pub name: String,
    pub content: String,
    pub summary: Option<String>,
    pub core_facts: Option<String>,

    pub content_type: ContentType,
    pub availability: Availability,
    pub display: DisplayMode,

    /// Only meaningful when `content_type == CharacterProfile`: marks THE
    /// user's profile. At most one per profile (§3.2 invariant 2).
    pub is_user: bool,
    pub is_enabled: bool,
    pub is_archived: bool,

    // Manual fields
    pub use_next_turn_only: bool,
    pub use_every_turn: bool,
    pub previous_availability: Option<Availability>,

    // Trigger fields
    pub trigger_keywords: String,
    pub trigger_lookback_turns: u32,
    pub trigger_min_match_count: u32,

    // Semantic fields
    pub vector_id: Option<String>,
    pub embedding_updated_at: Option<Timestamp>,
    pub in_vector_db: bool,

    // Source / origin
    pub source_session_id: Option<SessionId>,
    pub speaker: Option<String>,
    pub subtype: Option<String>,
    pub nonverbal_behavior: Option<String>,

    // Relevance
    pub relevance_score: u8,
    pub relevance_reason: Option<String>,
    pub cooldown_turns: u32,
    pub used_last_on_turn_id: Option<TurnId>,

    pub tags: BTreeSet<String>,
    pub usage_count: u64,
    pub trigger_count: u64,
    pub last_used_at: Option<Timestamp>,
    pub last_triggered_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub token_count: Option<u32>,
}

impl ContextData {
    /// Validate this entry's (type, availability) pair against the
    /// §3.1 table.
    pub fn validate_availability(&self) -> PipelineResult<()> {
        if self.availability.is_valid_for(self.content_type) {
            Ok(())
        } else {
            Err(PipelineError::InvalidCombination {
                content_type: self.content_type,
                availability: self.availability,
            })
        }
    }

    /// §3.2 invariant 4 / scenario S2: cooldown monotonicity. An item may
    /// not be *re-selected* until `current_turn_seq - used_last_on_turn_seq
    /// >= cooldown_turns`. Turn sequence numbers (not the opaque turn id)
    /// carry the "how many turns ago" distance; a ranking reader resolves
    /// `used_last_on_turn_id` to its sequence number via the session before
    /// calling this.
    pub fn is_on_cooldown_at(&self, current_turn_seq: u64, used_last_on_turn_seq: Option<u64>) -> bool {
        if self.cooldown_turns == 0 {
            return false;
        }
        match used_last_on_turn_seq {
            None => false,
            Some(last) => current_turn_seq.saturating_sub(last) < self.cooldown_turns as u64,
        }
    }

    /// Select which body to render per §4.6's display-content selection.
    pub fn display_text(&self) -> &str {
        match self.display {
            DisplayMode::Content => &self.content,
            DisplayMode::Summary => self.summary.as_deref().unwrap_or(&self.content),
            DisplayMode::CoreFacts => self.core_facts.as_deref().unwrap_or(&self.content),
        }
    }

    /// §3.2 invariant 6: vector-id shape.
    pub fn expected_vector_id(&self) -> String {
        format!("{}#{}#full", self.content_type.as_str(), self.id)
    }

    pub fn trigger_keyword_list(&self) -> Vec<String> {
        self.trigger_keywords
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
