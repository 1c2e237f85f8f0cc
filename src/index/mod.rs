//! Immutable in-memory index of chunks and their embeddings.
//!
//! Chunks and vectors are stored in parallel and matched by position only.
//! An [`Index`] is either fully built or not built at all; nothing mutates it
//! afterwards, so it can be shared across concurrent queries behind an `Arc`.

use crate::chunking::Chunk;
use crate::embedding::{validate_embeddings, Embedder};
use crate::error::{BrosurError, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument};

/// Ordered pairing of chunks with embedding vectors from a single model.
#[derive(Debug, Clone)]
pub struct Index {
    model: String,
    dimensions: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl Index {
    /// Embed every chunk and build the index.
    ///
    /// Chunks are sent in batches of `batch_size` (1 = one call per chunk), with
    /// up to `max_concurrent` calls in flight. The first failure aborts the whole
    /// build; the error carries the position of the offending chunk.
    #[instrument(skip_all, fields(chunks = chunks.len(), model = %embedder.model_id()))]
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        batch_size: usize,
        max_concurrent: usize,
    ) -> Result<Self> {
        let batch_size = batch_size.max(1);
        let dimensions = embedder.dimensions();

        let batches: Vec<(usize, Vec<String>)> = chunks
            .chunks(batch_size)
            .enumerate()
            .map(|(n, batch)| {
                (
                    n * batch_size,
                    batch.iter().map(|c| c.text.clone()).collect(),
                )
            })
            .collect();

        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches)
            .map(|(offset, texts)| async move {
                debug!("Embedding chunks {}..{}", offset, offset + texts.len());
                let vectors = embedder
                    .embed_batch(&texts)
                    .await
                    .map_err(|e| e.at_chunk_offset(offset))?;
                validate_embeddings(texts.len(), dimensions, &vectors)
                    .map_err(|e| e.at_chunk_offset(offset))?;
                Ok::<_, BrosurError>(vectors)
            })
            .buffered(max_concurrent.max(1))
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = embedded.into_iter().flatten().collect();
        let index = Self::from_parts(embedder.model_id(), dimensions, chunks, vectors)?;

        info!("Built index with {} chunks", index.len());
        Ok(index)
    }

    /// Assemble an index from precomputed vectors.
    pub fn from_parts(
        model: &str,
        dimensions: usize,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(BrosurError::InvalidInput(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        validate_embeddings(chunks.len(), dimensions, &vectors)?;

        Ok(Self {
            model: model.to_string(),
            dimensions,
            chunks,
            vectors,
        })
    }

    /// Model that produced the vectors.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Dimensionality shared by every vector.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk at position `i`.
    pub fn chunk(&self, i: usize) -> Option<&Chunk> {
        self.chunks.get(i)
    }

    /// Vector at position `i`.
    pub fn vector(&self, i: usize) -> Option<&[f32]> {
        self.vectors.get(i).map(Vec::as_slice)
    }

    /// All chunks, in corpus order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Iterate `(chunk, vector)` pairs in corpus order.
    pub fn entries(&self) -> impl Iterator<Item = (&Chunk, &[f32])> {
        self.chunks
            .iter()
            .zip(self.vectors.iter().map(Vec::as_slice))
    }
}
