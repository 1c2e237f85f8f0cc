//! RAG response generation.

use super::{Completer, PromptAssembler, Turn};
use crate::error::{BrosurError, FailureKind, Result};
use crate::retrieval::{RetrievalResult, Retriever};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// RAG engine for question answering.
///
/// Holds no per-conversation state; one engine serves every session and
/// request concurrently.
pub struct RagEngine {
    retriever: Arc<Retriever>,
    assembler: PromptAssembler,
    completer: Arc<dyn Completer>,
    top_k: usize,
    completion_timeout: Option<Duration>,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(
        retriever: Arc<Retriever>,
        assembler: PromptAssembler,
        completer: Arc<dyn Completer>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            assembler,
            completer,
            top_k: top_k.max(1),
            completion_timeout: None,
        }
    }

    /// Bound how long a completion may take.
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    /// Chunks retrieved per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The prompt assembler in use.
    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    /// The underlying retriever.
    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    /// Retrieve context for a question.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve_k(query, self.top_k).await
    }

    /// Retrieve context for a question with an explicit `k`.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if query.trim().is_empty() {
            return Err(BrosurError::InvalidInput("Message is empty".to_string()));
        }
        self.retriever.retrieve(query, k).await
    }

    /// Send messages to the language model, honouring the completion timeout.
    pub async fn complete(&self, messages: &[Turn]) -> Result<String> {
        match self.completion_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.completer.complete(messages))
                .await
                .map_err(|_| {
                    BrosurError::completion(
                        FailureKind::Transient,
                        format!("Timed out after {:?}", timeout),
                    )
                })?,
            None => self.completer.complete(messages).await,
        }
    }

    /// Answer a single question without conversation history.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer(&self, question: &str) -> Result<RagResponse> {
        info!("Processing question");

        let retrieved = self.retrieve(question).await?;
        let messages = self.assembler.assemble(&retrieved, question);
        let reply = self.complete(&messages).await?;

        debug!("Generated reply with {} context chunks", retrieved.len());

        Ok(RagResponse {
            reply,
            retrieved,
        })
    }
}

/// A RAG reply with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    /// The generated reply.
    pub reply: String,
    /// Retrieved chunks, best first.
    pub retrieved: RetrievalResult,
}
