//! `VectorStore` — the content-addressed vector store capability trait
//! (§4.2). A real vector-database driver is out of scope per §1; only
//! `MockVectorStore`, an in-memory cosine-search implementation, ships here.

use async_trait::async_trait;
use ctxcore::PipelineResult;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::wire::VectorPoint;

/// Default embedding dimensionality, matching the distillation's reference
/// value (§4.2).
pub const DEFAULT_DIMENSIONS: usize = 3072;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub payload_id: String,
    pub score: f32,
    pub json: String,
    pub session: Option<String>,
    pub entry_type: String,
    pub db_pk: String,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent create with fixed dimensionality and cosine distance.
    async fn ensure_collection(&self) -> PipelineResult<()>;

    /// Overwrites on same id.
    async fn upsert_batch(&self, points: Vec<VectorPoint>) -> PipelineResult<()>;

    /// Ordered by descending cosine score, truncated to `k`.
    async fn search(&self, vector: &[f32], entry_type_prefix: &str, k: usize) -> PipelineResult<Vec<SearchHit>>;

    async fn delete(&self, ids: &[String]) -> PipelineResult<()>;
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[derive(Default)]
pub struct MockVectorStore {
    points: RwLock<HashMap<String, VectorPoint>>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn ensure_collection(&self) -> PipelineResult<()> {
        Ok(())
    }

    async fn upsert_batch(&self, points: Vec<VectorPoint>) -> PipelineResult<()> {
        let mut guard = self.points.write();
        for point in points {
            guard.insert(point.db_pk.clone(), point);
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], entry_type_prefix: &str, k: usize) -> PipelineResult<Vec<SearchHit>> {
        let guard = self.points.read();
        let mut scored: Vec<SearchHit> = guard
            .values()
            .filter(|p| p.entry_type.starts_with(entry_type_prefix))
            .map(|p| SearchHit {
                payload_id: p.payload_id.clone(),
                score: cosine(vector, &p.vector),
                json: p.json.clone(),
                session: p.session.clone(),
                entry_type: p.entry_type.clone(),
                db_pk: p.db_pk.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete(&self, ids: &[String]) -> PipelineResult<()> {
        let mut guard = self.points.write();
        for id in ids {
            guard.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(db_pk: &str, entry_type: &str, vector: Vec<f32>) -> VectorPoint {
        VectorPoint {
            payload_id: db_pk.to_string(),
            json: "{}".to_string(),
            session: None,
            entry_type: entry_type.to_string(),
            db_pk: db_pk.to_string(),
            chunk_index: 0,
            speaker: None,
            vector,
        }
    }

    #[tokio::test]
    async fn search_orders_by_descending_cosine_score() {
        let store = MockVectorStore::new();
        store
            .upsert_batch(vec![
                point("a", "quote", vec![1.0, 0.0]),
                point("b", "quote", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        let hits = store.search(&[1.0, 0.0], "quote", 2).await.unwrap();
        assert_eq!(hits[0].db_pk, "a");
    }

    #[tokio::test]
    async fn search_filters_by_entry_type_prefix() {
        let store = MockVectorStore::new();
        store
            .upsert_batch(vec![point("a", "quote#1", vec![1.0]), point("b", "memory#1", vec![1.0])])
            .await
            .unwrap();
        let hits = store.search(&[1.0], "quote", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].db_pk, "a");
    }

    #[tokio::test]
    async fn upsert_overwrites_same_id() {
        let store = MockVectorStore::new();
        store.upsert_batch(vec![point("a", "quote", vec![1.0])]).await.unwrap();
        store.upsert_batch(vec![point("a", "quote", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_points() {
        let store = MockVectorStore::new();
        store.upsert_batch(vec![point("a", "quote", vec![1.0])]).await.unwrap();
        store.delete(&["a".to_string()]).await.unwrap();
        assert!(store.is_empty());
    }
}
