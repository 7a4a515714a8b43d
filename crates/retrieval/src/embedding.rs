// Embedding provider contract, a hash-based placeholder provider and the
// memoization table used by the scorer

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::types::ToolSpec;

/// Maps text to a fixed-dimension vector. Must be deterministic for identical input.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Placeholder provider: hashed bag of tokens, unit-normalized.
///
/// Texts sharing words share vector components, which is enough for tests and
/// offline use. Production deployments should inject a real model.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    pub dimension: usize,
    pub seed: u64,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize, seed: u64) -> Self {
        Self {
            dimension: dimension.max(1),
            seed,
        }
    }

    pub fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = self.hash_string(token);
            let index = (hash % self.dimension as u64) as usize;
            // second bucket with a sign flip spreads collisions
            let index2 = ((hash >> 32) % self.dimension as u64) as usize;
            embedding[index] += 1.0;
            embedding[index2] -= 0.5;
        }

        normalize(&mut embedding);
        embedding
    }

    fn hash_string(&self, text: &str) -> u64 {
        text.chars()
            .enumerate()
            .map(|(i, c)| (c as u64).wrapping_mul(i as u64 + 1))
            .fold(self.seed, |acc, x| acc.wrapping_add(x).wrapping_mul(31))
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(256, 42)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }
}

pub fn normalize(embedding: &mut [f32]) {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in embedding.iter_mut() {
            *val /= norm;
        }
    }
}

/// Cosine similarity in [-1, 1]. `None` when the vectors cannot be compared.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    Some((dot_product / (norm_a * norm_b)) as f64)
}

/// Process-lifetime memoization of tool and query embeddings
pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    tools: RwLock<HashMap<String, Arc<Vec<f32>>>>,
    queries: RwLock<HashMap<String, Arc<Vec<f32>>>>,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("dimension", &self.provider.dimension())
            .finish()
    }
}

impl EmbeddingCache {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            tools: RwLock::new(HashMap::new()),
            queries: RwLock::new(HashMap::new()),
        }
    }

    // A changed timestamp yields a new key, so stale vectors are never reused
    fn tool_key(tool: &ToolSpec) -> String {
        format!("{}@{}", tool.id, tool.last_updated.timestamp_millis())
    }

    pub async fn tool_embedding(&self, tool: &ToolSpec) -> Result<Arc<Vec<f32>>> {
        let key = Self::tool_key(tool);
        if let Some(hit) = self.tools.read().await.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let embedding = Arc::new(self.provider.embed(&tool.embedding_text()).await?);
        debug!(tool_id = %tool.id, "computed tool embedding");
        self.tools.write().await.insert(key, Arc::clone(&embedding));
        Ok(embedding)
    }

    pub async fn query_embedding(&self, query: &str) -> Result<Arc<Vec<f32>>> {
        if let Some(hit) = self.queries.read().await.get(query) {
            return Ok(Arc::clone(hit));
        }

        let embedding = Arc::new(self.provider.embed(query).await?);
        self.queries
            .write()
            .await
            .insert(query.to_string(), Arc::clone(&embedding));
        Ok(embedding)
    }

    /// Semantic similarity of a tool to a query. Missing or incomparable
    /// vectors score 0; provider failures propagate.
    pub async fn similarity(&self, tool: &ToolSpec, query: &str) -> Result<f64> {
        let query_embedding = self.query_embedding(query).await?;
        let tool_embedding = self.tool_embedding(tool).await?;

        match cosine_similarity(&tool_embedding, &query_embedding) {
            Some(similarity) => Ok(similarity),
            None => {
                warn!(
                    tool_id = %tool.id,
                    tool_dim = tool_embedding.len(),
                    query_dim = query_embedding.len(),
                    "no comparable embedding, semantic score set to 0"
                );
                Ok(0.0)
            }
        }
    }

    pub async fn len(&self) -> (usize, usize) {
        (self.tools.read().await.len(), self.queries.read().await.len())
    }

    pub async fn clear(&self) {
        self.tools.write().await.clear();
        self.queries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCategory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        inner: HashEmbeddingProvider,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn dimension(&self) -> usize {
            self.inner.dimension
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.inner.generate(text))
        }
    }

    struct EmptyProvider;

    #[async_trait]
    impl EmbeddingProvider for EmptyProvider {
        fn dimension(&self) -> usize {
            0
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let sim1 = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        let sim2 = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]).unwrap();
        let sim3 = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();

        assert!((sim1 - 0.0).abs() < 1e-6);
        assert!((sim2 - 1.0).abs() < 1e-6);
        assert!((sim3 + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).is_none());
    }

    #[test]
    fn test_hash_embedding_is_deterministic_and_normalized() {
        let provider = HashEmbeddingProvider::new(128, 7);

        let a = provider.generate("read file content");
        let b = provider.generate("read file content");
        let c = provider.generate("network connection");

        assert_eq!(a, b);
        assert_ne!(a, c);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_more_similar() {
        let provider = HashEmbeddingProvider::default();

        let base = provider.generate("scan dependencies for vulnerabilities");
        let related = provider.generate("vulnerabilities scan");
        let unrelated = provider.generate("render markdown table");

        let sim_related = cosine_similarity(&base, &related).unwrap();
        let sim_unrelated = cosine_similarity(&base, &unrelated).unwrap();
        assert!(sim_related > sim_unrelated);
    }

    #[tokio::test]
    async fn test_cache_memoizes_by_tool_and_timestamp() {
        let provider = Arc::new(CountingProvider {
            inner: HashEmbeddingProvider::default(),
            calls: AtomicUsize::new(0),
        });
        let cache = EmbeddingCache::new(provider.clone());
        let mut tool = ToolSpec::new("fmt", "Formatter", "formats code", ToolCategory::Code);

        cache.similarity(&tool, "format code").await.unwrap();
        cache.similarity(&tool, "format code").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        tool.last_updated = tool.last_updated + chrono::Duration::seconds(1);
        cache.similarity(&tool, "format code").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len().await, (2, 1));
    }

    #[tokio::test]
    async fn test_missing_vectors_score_zero() {
        let cache = EmbeddingCache::new(Arc::new(EmptyProvider));
        let tool = ToolSpec::new("fmt", "Formatter", "formats code", ToolCategory::Code);

        let score = cache.similarity(&tool, "format").await.unwrap();
        assert_eq!(score, 0.0);
    }
}
