//! Property-based tests for the quantified invariants of §8 that are
//! checkable purely at the data-model level (dedup law, validity closure).

use proptest::prelude::*;

use crate::{
    Availability, ConcurrentDedupBucket, ContentType, ContextData, ContextDataId, DisplayMode,
    EntityIdType, ProfileId, Timestamp,
};
use std::collections::BTreeSet;

fn arb_content_type() -> impl Strategy<Value = ContentType> {
    prop_oneof![
        Just(ContentType::Quote),
        Just(ContentType::PersonaVoiceSample),
        Just(ContentType::Memory),
        Just(ContentType::Insight),
        Just(ContentType::CharacterProfile),
        Just(ContentType::Generic),
    ]
}

fn arb_availability() -> impl Strategy<Value = Availability> {
    prop_oneof![
        Just(Availability::AlwaysOn),
        Just(Availability::Manual),
        Just(Availability::Semantic),
        Just(Availability::Trigger),
        Just(Availability::Archive),
    ]
}

fn item_with(content_type: ContentType, availability: Availability) -> ContextData {
    let now = Timestamp::from_timestamp(0, 0).unwrap();
    ContextData {
        id: ContextDataId::now_v7(),
        profile_id: ProfileId::nil(),
        name: "x".into(),
        content: "body".into(),
        summary: None,
        core_facts: None,
        content_type,
        availability,
        display: DisplayMode::Content,
        is_user: false,
        is_enabled: true,
        is_archived: false,
        use_next_turn_only: false,
        use_every_turn: false,
        previous_availability: None,
        trigger_keywords: String::new(),
        trigger_lookback_turns: 0,
        trigger_min_match_count: 1,
        vector_id: None,
        embedding_updated_at: None,
        in_vector_db: false,
        source_session_id: None,
        speaker: None,
        subtype: None,
        nonverbal_behavior: None,
        relevance_score: 0,
        relevance_reason: None,
        cooldown_turns: 0,
        used_last_on_turn_id: None,
        tags: BTreeSet::new(),
        usage_count: 0,
        trigger_count: 0,
        last_used_at: None,
        last_triggered_at: None,
        created_at: now,
        updated_at: now,
        token_count: None,
    }
}

proptest! {
    /// Dedup law (§8.1): inserting N items, some with repeated ids, into a
    /// bucket never leaves more entries than distinct ids.
    #[test]
    fn dedup_law_holds_for_repeated_ids(n in 1usize..20, repeat_every in 1usize..5) {
        let bucket = ConcurrentDedupBucket::new();
        let mut distinct_ids = Vec::new();
        for i in 0..n {
            let id = if i % repeat_every == 0 && !distinct_ids.is_empty() {
                distinct_ids[0]
            } else {
                let id = ContextDataId::now_v7();
                distinct_ids.push(id);
                id
            };
            let _ = bucket.insert(item_with_id(id));
        }
        let ids = bucket.ids();
        let unique: std::collections::HashSet<_> = ids.iter().cloned().collect();
        prop_assert_eq!(ids.len(), unique.len());
    }

    /// Validity closure (§8.2): for every (type, availability) pair
    /// declared valid by the table, constructing and validating an item
    /// with that pair never errors; for invalid pairs it always errors.
    #[test]
    fn validity_closure_matches_table(content_type in arb_content_type(), availability in arb_availability()) {
        let item = item_with(content_type, availability);
        let expected_valid = availability.is_valid_for(content_type);
        prop_assert_eq!(item.validate_availability().is_ok(), expected_valid);
    }
}

fn item_with_id(id: ContextDataId) -> ContextData {
    let mut item = item_with(ContentType::Memory, Availability::AlwaysOn);
    item.id = id;
    item
}
