//! An in-memory `ContextDataStore`, the only storage backend this crate
//! provides (a real relational store is explicitly out of scope, §1).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ctxcore::{
    Availability, BatchResult, ContentType, ContextData, EntityIdType, PipelineError,
    PipelineResult, ProfileId, Timestamp,
};
use ctxcore::{ContextDataId, TurnId};
use tokio::sync::RwLock;

use crate::store::{not_found, ContextDataStore};

#[derive(Debug, Default)]
pub struct MockContextDataStore {
    items: Arc<RwLock<HashMap<ContextDataId, ContextData>>>,
}

impl MockContextDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, item: ContextData) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn clear(&self) {
        self.items.write().await.clear();
    }

    pub async fn count(&self) -> usize {
        self.items.read().await.len()
    }
}

fn now() -> Timestamp {
    Timestamp::from_timestamp(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0),
        0,
    )
    .unwrap()
}

#[async_trait]
impl ContextDataStore for MockContextDataStore {
    async fn get_user_profile(&self, profile_id: ProfileId) -> PipelineResult<Option<ContextData>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .find(|d| {
                d.profile_id == profile_id
                    && d.content_type == ContentType::CharacterProfile
                    && d.is_user
                    && d.is_enabled
                    && !d.is_archived
            })
            .cloned())
    }

    async fn get_always_on(
        &self,
        profile_id: ProfileId,
        content_type: Option<ContentType>,
    ) -> PipelineResult<Vec<ContextData>> {
        let items = self.items.read().await;
        let mut result: Vec<ContextData> = items
            .values()
            .filter(|d| {
                d.profile_id == profile_id
                    && d.availability == Availability::AlwaysOn
                    && d.is_enabled
                    && !d.is_archived
                    && content_type.map_or(true, |t| d.content_type == t)
            })
            .cloned()
            .collect();
        result.sort_by_key(|d| (format!("{:?}", d.content_type), d.created_at));
        Ok(result)
    }

    async fn get_active_manual(
        &self,
        profile_id: ProfileId,
        content_type: Option<ContentType>,
    ) -> PipelineResult<Vec<ContextData>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|d| {
                d.profile_id == profile_id
                    && d.availability == Availability::Manual
                    && d.is_enabled
                    && !d.is_archived
                    && (d.use_next_turn_only || d.use_every_turn)
                    && content_type.map_or(true, |t| d.content_type == t)
            })
            .cloned()
            .collect())
    }

    async fn get_trigger_candidates(&self, profile_id: ProfileId) -> PipelineResult<Vec<ContextData>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|d| {
                d.profile_id == profile_id
                    && d.availability == Availability::Trigger
                    && d.is_enabled
                    && !d.is_archived
                    && !d.trigger_keywords.trim().is_empty()
            })
            .cloned()
            .collect())
    }

    async fn set_use_next_turn(&self, id: ContextDataId) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| not_found(id))?;
        if item.availability != Availability::Manual {
            item.previous_availability = Some(item.availability);
            item.availability = Availability::Manual;
        }
        item.use_next_turn_only = true;
        item.updated_at = now();
        Ok(())
    }

    async fn set_use_every_turn(&self, id: ContextDataId, on: bool) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| not_found(id))?;
        if on && item.availability != Availability::Manual {
            item.previous_availability = Some(item.availability);
            item.availability = Availability::Manual;
        }
        item.use_every_turn = on;
        item.updated_at = now();
        Ok(())
    }

    async fn clear_manual_flags(&self, id: ContextDataId) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| not_found(id))?;
        item.use_next_turn_only = false;
        item.use_every_turn = false;
        if let Some(previous) = item.previous_availability.take() {
            item.availability = previous;
        }
        item.updated_at = now();
        Ok(())
    }

    async fn process_post_turn(&self, profile_id: ProfileId) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        for item in items
            .values_mut()
            .filter(|d| d.profile_id == profile_id && d.use_next_turn_only)
        {
            item.use_next_turn_only = false;
            if let Some(previous) = item.previous_availability.take() {
                item.availability = previous;
            }
            item.updated_at = now();
        }
        Ok(())
    }

    async fn change_availability(&self, id: ContextDataId, new: Availability) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| not_found(id))?;
        if !new.is_valid_for(item.content_type) {
            return Err(PipelineError::InvalidCombination {
                content_type: item.content_type,
                availability: new,
            });
        }
        if item.availability == Availability::Manual && new != Availability::Manual {
            item.use_next_turn_only = false;
            item.use_every_turn = false;
            item.previous_availability = None;
        }
        item.availability = new;
        item.updated_at = now();
        Ok(())
    }

    async fn record_usage(&self, ids: &[ContextDataId]) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        let stamp = now();
        for id in ids {
            if let Some(item) = items.get_mut(id) {
                item.usage_count += 1;
                item.last_used_at = Some(stamp);
            }
        }
        Ok(())
    }

    async fn mark_used_on_turn(&self, id: ContextDataId, turn_id: TurnId) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| not_found(id))?;
        item.used_last_on_turn_id = Some(turn_id);
        Ok(())
    }

    async fn record_trigger_fired(&self, id: ContextDataId) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| not_found(id))?;
        item.usage_count += 1;
        item.trigger_count += 1;
        item.last_triggered_at = Some(now());
        Ok(())
    }

    async fn apply_tags_and_relevance(
        &self,
        updates: &[(ContextDataId, Vec<String>, u8, Option<String>)],
    ) -> PipelineResult<BatchResult> {
        let mut items = self.items.write().await;
        let mut result = BatchResult::default();
        for (id, tags, score, reason) in updates {
            match items.get_mut(id) {
                Some(item) => {
                    item.tags.extend(tags.iter().cloned());
                    item.relevance_score = *score;
                    item.relevance_reason = reason.clone();
                    item.updated_at = now();
                    result.record_success(*id);
                }
                None => result.record_failure(format!("context_data not found: {id}")),
            }
        }
        Ok(result)
    }

    async fn get(&self, id: ContextDataId) -> PipelineResult<Option<ContextData>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn get_unsynced_semantic(&self, profile_id: ProfileId) -> PipelineResult<Vec<ContextData>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|d| {
                d.profile_id == profile_id
                    && d.availability == Availability::Semantic
                    && !d.in_vector_db
            })
            .cloned()
            .collect())
    }

    async fn mark_embedded(&self, id: ContextDataId, vector_id: String) -> PipelineResult<()> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| not_found(id))?;
        item.vector_id = Some(vector_id);
        item.in_vector_db = true;
        item.embedding_updated_at = Some(now());
        Ok(())
    }
}
