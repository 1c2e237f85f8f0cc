//! Embedding generation for semantic search and retrieval.

mod cache;
mod openai;

pub use cache::{CacheStats, CachedEmbedder, EmbeddingCache};
pub use openai::OpenAIEmbedder;

use crate::error::{BrosurError, FailureKind, Result};
use async_trait::async_trait;

/// Trait for embedding generation.
///
/// Implementations must return exactly one vector per input, in input order.
/// Embedding errors may carry a `chunk_index` relative to the batch they were
/// given.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| BrosurError::embedding(FailureKind::Malformed, "Empty embedding response"))
    }

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Identifier of the model producing the vectors.
    fn model_id(&self) -> &str;
}

/// Check that a service response has one non-empty vector of the expected
/// dimensionality per input.
pub fn validate_embeddings(expected_count: usize, dimensions: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(BrosurError::EmbeddingService {
            chunk_index: Some(vectors.len().min(expected_count)),
            kind: FailureKind::Malformed,
            message: format!("Expected {} embeddings, got {}", expected_count, vectors.len()),
        });
    }

    for (i, vector) in vectors.iter().enumerate() {
        if vector.len() != dimensions {
            return Err(BrosurError::EmbeddingService {
                chunk_index: Some(i),
                kind: FailureKind::Malformed,
                message: format!(
                    "Expected {} dimensions, got {}",
                    dimensions,
                    vector.len()
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic embedders for tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps known texts to fixed vectors; unknown texts get a zero vector.
    pub struct StubEmbedder {
        model: String,
        dimensions: usize,
        vectors: HashMap<String, Vec<f32>>,
        fail_on: Option<String>,
        pub calls: AtomicUsize,
        pub texts_embedded: AtomicUsize,
    }

    impl StubEmbedder {
        pub fn new(dimensions: usize) -> Self {
            Self {
                model: "stub-model".to_string(),
                dimensions,
                vectors: HashMap::new(),
                fail_on: None,
                calls: AtomicUsize::new(0),
                texts_embedded: AtomicUsize::new(0),
            }
        }

        pub fn with_model(mut self, model: &str) -> Self {
            self.model = model.to_string();
            self
        }

        pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.to_string(), vector);
            self
        }

        /// Fail any batch containing `text`, reporting its batch-relative index.
        pub fn failing_on(mut self, text: &str) -> Self {
            self.fail_on = Some(text.to_string());
            self
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(bad) = &self.fail_on {
                if let Some(i) = texts.iter().position(|t| t == bad) {
                    return Err(BrosurError::EmbeddingService {
                        chunk_index: Some(i),
                        kind: FailureKind::Transient,
                        message: "stub failure".to_string(),
                    });
                }
            }

            self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    self.vectors
                        .get(t)
                        .cloned()
                        .unwrap_or_else(|| vec![0.0; self.dimensions])
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_id(&self) -> &str {
            &self.model
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubEmbedder;
    use super::*;

    #[tokio::test]
    async fn test_default_embed_uses_batch() {
        let embedder = StubEmbedder::new(2).with_vector("hi", vec![1.0, 0.0]);
        assert_eq!(embedder.embed("hi").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(embedder.embed("unknown").await.unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_validate_embeddings() {
        assert!(validate_embeddings(2, 2, &[vec![1.0, 0.0], vec![0.0, 1.0]]).is_ok());

        match validate_embeddings(2, 2, &[vec![1.0, 0.0], vec![0.0]]) {
            Err(BrosurError::EmbeddingService {
                chunk_index, kind, ..
            }) => {
                assert_eq!(chunk_index, Some(1));
                assert_eq!(kind, FailureKind::Malformed);
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(validate_embeddings(3, 2, &[vec![1.0, 0.0]]).is_err());
    }
}
