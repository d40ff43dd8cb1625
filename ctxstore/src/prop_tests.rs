//! Property-based tests for §8 invariants that span multiple store calls.

use proptest::prelude::*;

use ctxcore::{Availability, ContentType, ContextData, ContextDataId, DisplayMode, EntityIdType, ProfileId, Timestamp};
use std::collections::BTreeSet;

use crate::{ContextDataStore, MockContextDataStore};

fn item(profile_id: ProfileId, availability: Availability) -> ContextData {
    let now = Timestamp::from_timestamp(0, 0).unwrap();
    ContextData {
        id: ContextDataId::now_v7(),
        profile_id,
        name: "x".into(),
        content: "body".into(),
        summary: None,
        core_facts: None,
        content_type: ContentType::Memory,
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

#[derive(Debug, Clone, Copy)]
enum ManualOp {
    SetUseNextTurn,
    SetUseEveryTurn(bool),
    ClearManualFlags,
}

fn arb_op() -> impl Strategy<Value = ManualOp> {
    prop_oneof![
        Just(ManualOp::SetUseNextTurn),
        any::<bool>().prop_map(ManualOp::SetUseEveryTurn),
        Just(ManualOp::ClearManualFlags),
    ]
}

proptest! {
    /// Availability restore law (§8 property 5): after any sequence of
    /// SetUseNextTurn / SetUseEveryTurn / ClearManualFlags with no
    /// intervening ChangeAvailability, the final availability equals the
    /// pre-sequence availability iff the final manual flags are both
    /// false.
    #[test]
    fn availability_restore_law(ops in prop::collection::vec(arb_op(), 0..8)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let store = MockContextDataStore::new();
            let profile_id = ProfileId::now_v7();
            let starting = item(profile_id, Availability::AlwaysOn);
            let id = starting.id;
            let starting_availability = starting.availability;
            store.insert(starting).await;

            for op in &ops {
                match op {
                    ManualOp::SetUseNextTurn => store.set_use_next_turn(id).await.unwrap(),
                    ManualOp::SetUseEveryTurn(on) => store.set_use_every_turn(id, *on).await.unwrap(),
                    ManualOp::ClearManualFlags => store.clear_manual_flags(id).await.unwrap(),
                }
            }

            let final_item = store.get(id).await.unwrap().unwrap();
            let flags_both_false = !final_item.use_next_turn_only && !final_item.use_every_turn;
            let availability_restored = final_item.availability == starting_availability;
            prop_assert_eq!(availability_restored, flags_both_false);
            Ok(())
        })?;
    }
}
