//! `SemanticService` — the core's wrapper around `EmbeddingProvider` and
//! `VectorStore` for `ContextData` (§4.2).

use std::collections::HashMap;
use std::sync::Arc;

use ctxcore::{Availability, ContentType, ContextData, EntityIdType, PipelineResult, Timestamp};

use crate::embedding::EmbeddingProvider;
use crate::query_transformer::QueryTransformer;
use crate::vector_store::{SearchHit, VectorStore};
use crate::wire::VectorPoint;

/// Batch size for `sync_all`, per the distillation's reference value (§4.2).
pub const SYNC_BATCH_SIZE: usize = 96;

pub struct SemanticService {
    embedding: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
}

impl SemanticService {
    pub fn new(embedding: Arc<dyn EmbeddingProvider>, vectors: Arc<dyn VectorStore>) -> Self {
        Self { embedding, vectors }
    }

    fn display_text(item: &ContextData) -> String {
        item.display_text().to_string()
    }

    /// Builds the display text, embeds it, upserts with the vector id
    /// `"<type-lowercase>#<id>#full"`, then stamps `in_vector_db` and
    /// `embedding_updated_at` on a clone of the item (the store persists
    /// the mutation; this service only computes it).
    pub async fn embed_async(&self, item: &ContextData, now: Timestamp) -> PipelineResult<ContextData> {
        let text = Self::display_text(item);
        let vector = self.embedding.embed(&text).await?;
        let vector_id = item.expected_vector_id();

        self.vectors
            .upsert_batch(vec![VectorPoint {
                payload_id: item.id.to_string(),
                json: text.clone(),
                session: item.source_session_id.map(|s| s.to_string()),
                entry_type: item.content_type.as_str().to_string(),
                db_pk: vector_id.clone(),
                chunk_index: 0,
                speaker: item.speaker.clone(),
                vector,
            }])
            .await?;

        let mut updated = item.clone();
        updated.vector_id = Some(vector_id);
        updated.in_vector_db = true;
        updated.embedding_updated_at = Some(now);
        Ok(updated)
    }

    /// One embedding, then one search per requested type, filtered by
    /// `entryType` prefix.
    pub async fn search_multi_type(
        &self,
        query: &str,
        per_type_limits: &HashMap<ContentType, usize>,
    ) -> PipelineResult<HashMap<ContentType, Vec<SearchHit>>> {
        let vector = self.embedding.embed(query).await?;
        let mut results = HashMap::new();
        for (content_type, limit) in per_type_limits {
            if *limit == 0 {
                continue;
            }
            let hits = self.vectors.search(&vector, content_type.as_str(), *limit).await?;
            results.insert(*content_type, hits);
        }
        Ok(results)
    }

    /// §4.7: transforms the query first, falling back to the raw input on
    /// failure, then delegates to `search_multi_type`.
    pub async fn search_with_query_transformation(
        &self,
        transformer: &dyn QueryTransformer,
        current_input: &str,
        context_snippet: &str,
        per_type_limits: &HashMap<ContentType, usize>,
    ) -> PipelineResult<HashMap<ContentType, Vec<SearchHit>>> {
        let query = transformer
            .transform(current_input, context_snippet)
            .await
            .unwrap_or_else(|_| current_input.to_string());
        self.search_multi_type(&query, per_type_limits).await
    }

    /// For each `availability=Semantic` item not yet in the vector DB,
    /// batch-embed in groups of `SYNC_BATCH_SIZE` and upsert.
    pub async fn sync_all(&self, items: Vec<ContextData>, now: Timestamp) -> PipelineResult<Vec<ContextData>> {
        let pending: Vec<ContextData> = items
            .into_iter()
            .filter(|i| i.availability == Availability::Semantic && !i.in_vector_db)
            .collect();

        let mut synced = Vec::with_capacity(pending.len());
        for chunk in pending.chunks(SYNC_BATCH_SIZE) {
            let texts: Vec<&str> = chunk.iter().map(|i| i.content.as_str()).collect();
            let vectors = self.embedding.embed_batch(&texts).await?;
            let mut points = Vec::with_capacity(chunk.len());
            for (item, vector) in chunk.iter().zip(vectors.into_iter()) {
                points.push(VectorPoint {
                    payload_id: item.id.to_string(),
                    json: Self::display_text(item),
                    session: item.source_session_id.map(|s| s.to_string()),
                    entry_type: item.content_type.as_str().to_string(),
                    db_pk: item.expected_vector_id(),
                    chunk_index: 0,
                    speaker: item.speaker.clone(),
                    vector,
                });
            }
            self.vectors.upsert_batch(points).await?;
            for item in chunk {
                let mut updated = item.clone();
                updated.vector_id = Some(updated.expected_vector_id());
                updated.in_vector_db = true;
                updated.embedding_updated_at = Some(now);
                synced.push(updated);
            }
        }
        Ok(synced)
    }
}
