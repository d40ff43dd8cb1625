//! `ConversationState` — the mutable accumulator for one turn, and the
//! concurrent-safe bucket type enrichers append into.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{
    ContextData, ContextDataId, Flag, ProfileId, Session, SystemMessage, Turn, TurnId,
};

/// A perception record produced by `PerceptionEnricher`: a structured
/// `{property, explanation}` annotation of the current input.
#[derive(Debug, Clone)]
pub struct Perception {
    pub property: String,
    pub explanation: String,
}

/// An append-with-dedup collection keyed by `ContextDataId`, safe for
/// concurrent insertion from multiple enrichers. Insertion order is
/// preserved for callers that need a stable iteration order (the builder
/// snapshots once and reads in this order).
#[derive(Debug, Default)]
pub struct ConcurrentDedupBucket {
    order: Mutex<Vec<ContextDataId>>,
    items: Mutex<HashMap<ContextDataId, ContextData>>,
}

impl ConcurrentDedupBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item` if its id is not already present. Returns `true` if
    /// inserted, `false` if it was a duplicate (§3.2 invariant 3).
    pub fn insert(&self, item: ContextData) -> bool {
        let mut items = self.items.lock();
        if items.contains_key(&item.id) {
            return false;
        }
        self.order.lock().push(item.id);
        items.insert(item.id, item);
        true
    }

    pub fn contains(&self, id: ContextDataId) -> bool {
        self.items.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A stable snapshot in insertion order, for the builder to read once.
    pub fn snapshot(&self) -> Vec<ContextData> {
        let order = self.order.lock();
        let items = self.items.lock();
        order
            .iter()
            .filter_map(|id| items.get(id).cloned())
            .collect()
    }

    pub fn ids(&self) -> Vec<ContextDataId> {
        self.order.lock().clone()
    }
}

/// The seven type-bucketed `ContextData` collections a `ConversationState`
/// carries, plus the flags, perceptions, and turn-history scalars every
/// enricher may contribute to.
#[derive(Debug)]
pub struct ConversationState {
    pub profile_id: ProfileId,
    pub session: Session,
    pub current_turn: Turn,
    pub user_name: Mutex<String>,
    pub persona_name: String,
    pub persona_content: Mutex<Option<String>>,
    pub is_ooc_request: bool,

    pub user_profile: ConcurrentDedupBucket,
    pub character_profiles: ConcurrentDedupBucket,
    pub data: ConcurrentDedupBucket,
    pub memories: ConcurrentDedupBucket,
    pub insights: ConcurrentDedupBucket,
    pub persona_voice_samples: ConcurrentDedupBucket,
    pub quotes: ConcurrentDedupBucket,

    pub flags: Mutex<Vec<Flag>>,
    pub perceptions: Mutex<Vec<Perception>>,
    pub recent_turns: Mutex<Vec<Turn>>,
    pub previous_turn: Mutex<Option<Turn>>,
    pub dialogue_log: Mutex<Option<String>>,
}

impl ConversationState {
    pub fn new(profile_id: ProfileId, session: Session, current_turn: Turn, persona_name: String) -> Self {
        Self {
            profile_id,
            session,
            current_turn,
            user_name: Mutex::new(String::new()),
            persona_name,
            persona_content: Mutex::new(None),
            is_ooc_request: false,
            user_profile: ConcurrentDedupBucket::new(),
            character_profiles: ConcurrentDedupBucket::new(),
            data: ConcurrentDedupBucket::new(),
            memories: ConcurrentDedupBucket::new(),
            insights: ConcurrentDedupBucket::new(),
            persona_voice_samples: ConcurrentDedupBucket::new(),
            quotes: ConcurrentDedupBucket::new(),
            flags: Mutex::new(Vec::new()),
            perceptions: Mutex::new(Vec::new()),
            recent_turns: Mutex::new(Vec::new()),
            previous_turn: Mutex::new(None),
            dialogue_log: Mutex::new(None),
        }
    }

    /// The seven buckets, for code that needs to iterate all of them (e.g.
    /// the dedup-law property test, or `RecordUsage` at the end of the
    /// pipeline).
    pub fn buckets(&self) -> [&ConcurrentDedupBucket; 7] {
        [
            &self.user_profile,
            &self.character_profiles,
            &self.data,
            &self.memories,
            &self.insights,
            &self.persona_voice_samples,
            &self.quotes,
        ]
    }

    /// Routes an item into the bucket matching its content type. Used by
    /// `TriggerEnricher` and `SemanticDataEnricher`, which discover items
    /// whose type is only known at runtime.
    pub fn bucket_for(&self, content_type: crate::ContentType) -> &ConcurrentDedupBucket {
        use crate::ContentType::*;
        match content_type {
            CharacterProfile => &self.character_profiles,
            Generic => &self.data,
            Memory => &self.memories,
            Insight => &self.insights,
            PersonaVoiceSample => &self.persona_voice_samples,
            Quote => &self.quotes,
        }
    }

    /// §3.2 invariant 3 support: every id currently present across all
    /// seven buckets, for the post-turn `RecordUsage` batch call.
    pub fn all_context_data_ids(&self) -> Vec<ContextDataId> {
        self.buckets().iter().flat_map(|b| b.ids()).collect()
    }

    /// `true` iff `id` already appears in any of the seven buckets —
    /// the dedup check `SemanticDataEnricher` and the trigger/availability
    /// enrichers use before inserting a candidate.
    pub fn contains_anywhere(&self, id: ContextDataId) -> bool {
        self.buckets().iter().any(|b| b.contains(id))
    }

    pub fn current_turn_id(&self) -> TurnId {
        self.current_turn.id
    }
}
