//! `EmbeddingProvider` — the narrow async capability trait used by the
//! semantic index to turn text into vectors (§4.2). Only a deterministic
//! mock is shipped; a real HTTP-backed provider is out of scope (§1).

use async_trait::async_trait;
use ctxcore::{PipelineError, PipelineResult};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Errors on empty input rather than silently producing a zero vector.
    async fn embed(&self, text: &str) -> PipelineResult<Vec<f32>>;

    async fn embed_batch(&self, texts: &[&str]) -> PipelineResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize;
    fn model_id(&self) -> &str;
}

/// Deterministic, dependency-free embedding: sums byte values into
/// `dimensions` buckets and L2-normalizes. Same text always produces the
/// same vector, which is all the orchestrator and its tests require.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    model_id: String,
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(model_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimensions,
        }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut data = vec![0.0f32; self.dimensions];
        for (i, byte) in text.bytes().enumerate() {
            let idx = i % self.dimensions;
            data[idx] += (byte as f32) / 255.0;
        }
        let norm: f32 = data.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut data {
                *x /= norm;
            }
        }
        data
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> PipelineResult<Vec<f32>> {
        if text.is_empty() {
            return Err(PipelineError::InvalidInput {
                reason: "cannot embed empty text".into(),
            });
        }
        Ok(self.generate(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
