//! OpenAI embeddings implementation.

use super::{validate_embeddings, Embedder};
use crate::error::{BrosurError, FailureKind, Result};
use crate::openai::{classify_error, create_client_with_timeout};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Maximum inputs per embeddings request.
const MAX_BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-small", 1536, Duration::from_secs(300))
    }

    /// Create a new OpenAI embedder with custom model, dimensions and request timeout.
    pub fn with_config(model: &str, dimensions: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (batch_no, batch) in texts.chunks(MAX_BATCH_SIZE).enumerate() {
            let offset = batch_no * MAX_BATCH_SIZE;

            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(batch.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| {
                    BrosurError::embedding(
                        FailureKind::Permanent,
                        format!("Failed to build request: {}", e),
                    )
                    .at_chunk_offset(offset)
                })?;

            let response = self.client.embeddings().create(request).await.map_err(|e| {
                BrosurError::embedding(classify_error(&e), format!("Embedding API error: {}", e))
                    .at_chunk_offset(offset)
            })?;

            // Sort by index to ensure correct order
            let mut data = response.data;
            data.sort_by_key(|e| e.index);
            let embeddings: Vec<Vec<f32>> = data.into_iter().map(|e| e.embedding).collect();

            validate_embeddings(batch.len(), self.dimensions, &embeddings)
                .map_err(|e| e.at_chunk_offset(offset))?;

            all_embeddings.extend(embeddings);
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
