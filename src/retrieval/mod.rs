//! Top-K retrieval over an [`Index`] by cosine similarity.
//!
//! Every query is a full linear scan over the index. Results are ranked by
//! descending score, ties broken by ascending chunk position.

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::{BrosurError, Result};
use crate::index::Index;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is better).
    pub score: f32,
}

/// Ranked retrieval output, at most `k` entries, best first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Number of retrieved chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Retrieved chunk texts in ranked order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.chunk.text.as_str())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Rank every indexed chunk against `query` and keep the best `k`.
pub fn rank(index: &Index, query: &[f32], k: usize) -> RetrievalResult {
    let mut scored: Vec<(usize, f32)> = index
        .entries()
        .enumerate()
        .map(|(i, (_, vector))| (i, cosine_similarity(query, vector)))
        .collect();

    scored.sort_by(|(ia, sa), (ib, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| ia.cmp(ib))
    });
    scored.truncate(k);

    let chunks = scored
        .into_iter()
        .filter_map(|(i, score)| {
            index.chunk(i).map(|chunk| ScoredChunk {
                chunk: chunk.clone(),
                score,
            })
        })
        .collect();

    RetrievalResult { chunks }
}

/// Resolves query text to ranked chunks.
///
/// Owns the index together with the embedder that must produce query vectors
/// in the same space; construction fails if the two disagree on model or
/// dimensionality.
pub struct Retriever {
    index: Arc<Index>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    /// Pair an index with its query embedder.
    pub fn new(index: Arc<Index>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if embedder.model_id() != index.model() || embedder.dimensions() != index.dimensions() {
            return Err(BrosurError::ModelMismatch {
                index_model: format!("{} ({}d)", index.model(), index.dimensions()),
                embedder_model: format!("{} ({}d)", embedder.model_id(), embedder.dimensions()),
            });
        }
        Ok(Self { index, embedder })
    }

    /// The shared index.
    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    /// Retrieve the `k` chunks most similar to `query`.
    ///
    /// An empty index yields an empty result without contacting the embedder.
    #[instrument(skip(self, query))]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(BrosurError::InvalidInput("k must be at least 1".to_string()));
        }
        if self.index.is_empty() {
            debug!("Index is empty, nothing to retrieve");
            return Ok(RetrievalResult::default());
        }

        let query_vector = self.embedder.embed(query).await?;
        if query_vector.len() != self.index.dimensions() {
            return Err(BrosurError::embedding(
                crate::error::FailureKind::Malformed,
                format!(
                    "Query embedding has {} dimensions, index has {}",
                    query_vector.len(),
                    self.index.dimensions()
                ),
            ));
        }

        let result = rank(&self.index, &query_vector, k);
        debug!(
            "Retrieved {} chunks (best score {:?})",
            result.len(),
            result.chunks.first().map(|c| c.score)
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{Chunker, MarkerChunker};
    use crate::embedding::testing::StubEmbedder;

    const CORPUS: &str = "--- https://a\nHello world NEXT Goodbye world --- https://b\nFoo bar";

    fn scenario_embedder() -> StubEmbedder {
        StubEmbedder::new(2)
            .with_vector("Hello world", vec![1.0, 0.0])
            .with_vector("Goodbye world", vec![0.9, 0.1])
            .with_vector("Foo bar", vec![0.0, 1.0])
            .with_vector("Hello", vec![1.0, 0.0])
    }

    async fn scenario_retriever() -> Retriever {
        let embedder = Arc::new(scenario_embedder());
        let chunks = MarkerChunker::default().chunk(CORPUS);
        let index = Index::build(chunks, embedder.as_ref(), 10, 1).await.unwrap();
        Retriever::new(Arc::new(index), embedder).unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_zero_vector_similarity_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert!(!cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]).is_nan());
    }

    #[test]
    fn test_similarity_bounds() {
        let vectors = [
            vec![3.0, -4.0, 0.5],
            vec![1e-3, 2e3, -7.0],
            vec![-1.0, -1.0, -1.0],
            vec![0.1, 0.1, 0.1],
        ];
        for a in &vectors {
            for b in &vectors {
                let s = cosine_similarity(a, b);
                assert!((-1.0..=1.0).contains(&s), "{} out of range", s);
            }
        }
    }

    #[tokio::test]
    async fn test_scenario_top_two() {
        let retriever = scenario_retriever().await;
        let result = retriever.retrieve("Hello", 2).await.unwrap();

        let texts: Vec<&str> = result.texts().collect();
        assert_eq!(texts, vec!["Hello world", "Goodbye world"]);
        assert!((result.chunks[0].score - 1.0).abs() < 1e-6);
        assert!((result.chunks[1].score - 0.9939).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_k_larger_than_index_returns_all() {
        let retriever = scenario_retriever().await;
        let result = retriever.retrieve("Hello", 10).await.unwrap();

        assert_eq!(result.len(), 3);
        let texts: Vec<&str> = result.texts().collect();
        assert_eq!(texts, vec!["Hello world", "Goodbye world", "Foo bar"]);
    }

    #[tokio::test]
    async fn test_scores_non_increasing_and_length_min_k_n() {
        let retriever = scenario_retriever().await;
        for k in 1..=5 {
            let result = retriever.retrieve("Hello", k).await.unwrap();
            assert_eq!(result.len(), k.min(3));
            assert!(result
                .chunks
                .windows(2)
                .all(|w| w[0].score >= w[1].score));
        }
    }

    #[tokio::test]
    async fn test_self_similarity_is_maximal() {
        let embedder = Arc::new(scenario_embedder());
        let chunks = MarkerChunker::default().chunk(CORPUS);
        let index = Arc::new(Index::build(chunks, embedder.as_ref(), 10, 1).await.unwrap());

        for (chunk, vector) in index.entries() {
            let result = rank(&index, vector, 1);
            assert_eq!(result.chunks[0].chunk.position, chunk.position);
        }
    }

    #[test]
    fn test_ties_break_by_position() {
        let chunks = vec![
            Chunk::new(0, "x"),
            Chunk::new(1, "tie-a"),
            Chunk::new(2, "y"),
            Chunk::new(3, "tie-b"),
        ];
        let vectors = vec![
            vec![0.0, 1.0],
            vec![2.0, 0.0],
            vec![0.5, 0.5],
            vec![1.0, 0.0],
        ];
        let index = Index::from_parts("stub-model", 2, chunks, vectors).unwrap();

        let result = rank(&index, &[1.0, 0.0], 4);
        let positions: Vec<usize> = result.chunks.iter().map(|c| c.chunk.position).collect();
        assert_eq!(positions, vec![1, 3, 2, 0]);
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty_result() {
        let embedder = Arc::new(StubEmbedder::new(2).failing_on("anything"));
        let index = Index::build(Vec::new(), embedder.as_ref(), 10, 1).await.unwrap();
        let retriever = Retriever::new(Arc::new(index), embedder).unwrap();

        let result = retriever.retrieve("anything", 5).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_zero_k_rejected() {
        let retriever = scenario_retriever().await;
        assert!(matches!(
            retriever.retrieve("Hello", 0).await,
            Err(BrosurError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_reported() {
        let embedder = Arc::new(scenario_embedder().failing_on("boom"));
        let chunks = MarkerChunker::default().chunk(CORPUS);
        let index = Index::build(chunks, embedder.as_ref(), 10, 1).await.unwrap();
        let retriever = Retriever::new(Arc::new(index), embedder).unwrap();

        assert!(matches!(
            retriever.retrieve("boom", 2).await,
            Err(BrosurError::EmbeddingService { .. })
        ));
    }

    #[test]
    fn test_mismatched_embedder_rejected() {
        let index = Index::from_parts("model-a", 2, vec![], vec![]).unwrap();
        let embedder = Arc::new(StubEmbedder::new(2).with_model("model-b"));
        assert!(matches!(
            Retriever::new(Arc::new(index), embedder),
            Err(BrosurError::ModelMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_index() {
        let retriever = Arc::new(scenario_retriever().await);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let retriever = retriever.clone();
                tokio::spawn(async move { retriever.retrieve("Hello", 1).await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.chunks[0].chunk.text, "Hello world");
        }
    }
}
