//! Startup pipeline for Brosur.
//!
//! Coordinates corpus loading, chunking, embedding and index construction, and
//! wires the result into a [`RagEngine`]. Any failure here aborts startup; no
//! partially built index is ever handed out.

use crate::chunking::{load_corpus, Chunk, Chunker, MarkerChunker};
use crate::config::{Prompts, Settings};
use crate::embedding::{CachedEmbedder, Embedder, EmbeddingCache, OpenAIEmbedder};
use crate::error::Result;
use crate::index::Index;
use crate::rag::{Completer, OpenAICompleter, PromptAssembler, RagEngine};
use crate::retrieval::Retriever;
use crate::retry::{RetryingCompleter, RetryingEmbedder};
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the Brosur pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
}

impl Orchestrator {
    /// Create a new orchestrator, loading prompt templates.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self { settings, prompts })
    }

    /// The active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Read and chunk the corpus.
    pub fn load_chunks(&self) -> Result<Vec<Chunk>> {
        let corpus = load_corpus(&self.settings.corpus_path())?;
        let chunks = MarkerChunker::from_settings(&self.settings.corpus).chunk(&corpus);
        info!("Corpus split into {} chunks", chunks.len());
        Ok(chunks)
    }

    /// Open the embedding cache for the configured model.
    pub fn open_cache(&self) -> Result<EmbeddingCache> {
        EmbeddingCache::open(&self.settings.cache_path(), &self.settings.embedding.model)
    }

    /// The configured embedder: OpenAI with retries, behind the cache if enabled.
    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        let openai = OpenAIEmbedder::with_config(
            &self.settings.embedding.model,
            self.settings.embedding.dimensions as usize,
            self.settings.request_timeout(),
        )?;
        let embedder: Arc<dyn Embedder> = Arc::new(RetryingEmbedder::new(
            Arc::new(openai),
            self.settings.retry.policy(),
        ));

        if self.settings.cache.enabled {
            let cache = Arc::new(self.open_cache()?);
            Ok(Arc::new(CachedEmbedder::new(embedder, cache)?))
        } else {
            Ok(embedder)
        }
    }

    /// The configured completer, optionally overriding the model.
    pub fn completer(&self, model: Option<&str>) -> Result<Arc<dyn Completer>> {
        let model = model.unwrap_or(self.settings.rag.model.as_str());
        let openai = OpenAICompleter::new(model, self.settings.request_timeout())?
            .with_temperature(self.settings.rag.temperature);
        Ok(Arc::new(RetryingCompleter::new(
            Arc::new(openai),
            self.settings.retry.policy(),
        )))
    }

    /// Embed every chunk into an index.
    pub async fn build_index(&self, chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Index> {
        Index::build(
            chunks,
            embedder,
            self.settings.embedding.batch_size,
            self.settings.embedding.max_concurrent,
        )
        .await
    }

    /// Build a retriever over the corpus.
    pub async fn build_retriever(&self, embedder: Arc<dyn Embedder>) -> Result<Retriever> {
        let chunks = self.load_chunks()?;
        let index = self.build_index(chunks, embedder.as_ref()).await?;
        Retriever::new(Arc::new(index), embedder)
    }

    /// The prompt assembler described by the settings.
    pub fn assembler(&self) -> PromptAssembler {
        PromptAssembler::new(self.prompts.clone(), self.settings.rag.mode)
            .with_separator(self.settings.rag.context_separator.clone())
    }

    /// Build the engine from the configured OpenAI services.
    pub async fn build_engine(&self, model: Option<&str>) -> Result<RagEngine> {
        self.build_engine_with(self.embedder()?, self.completer(model)?)
            .await
    }

    /// Build the engine from the given services.
    #[instrument(skip_all)]
    pub async fn build_engine_with(
        &self,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
    ) -> Result<RagEngine> {
        let retriever = self.build_retriever(embedder).await?;
        info!(
            "Index ready: {} chunks, model {}",
            retriever.index().len(),
            retriever.index().model()
        );

        Ok(RagEngine::new(
            Arc::new(retriever),
            self.assembler(),
            completer,
            self.settings.rag.top_k,
        )
        .with_completion_timeout(self.settings.request_timeout()))
    }
}
