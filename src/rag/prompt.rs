//! Prompt assembly: framing retrieved context for the language model.

use super::Turn;
use crate::config::{ContextMode, Prompts};
use crate::retrieval::RetrievalResult;
use std::collections::HashMap;

/// Builds the system/user exchange sent to the language model.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    prompts: Prompts,
    mode: ContextMode,
    separator: String,
}

impl PromptAssembler {
    /// Create an assembler for the given context mode.
    pub fn new(prompts: Prompts, mode: ContextMode) -> Self {
        Self {
            prompts,
            mode,
            separator: "\n\n".to_string(),
        }
    }

    /// Set the delimiter placed between chunk texts.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Context policy in effect.
    pub fn mode(&self) -> ContextMode {
        self.mode
    }

    /// Chunk texts in ranked order, or the no-context notice when empty.
    pub fn context_block(&self, retrieved: &RetrievalResult) -> String {
        if retrieved.is_empty() {
            return self
                .prompts
                .render_with_custom(&self.prompts.rag.no_context, &HashMap::new());
        }
        retrieved.texts().collect::<Vec<_>>().join(&self.separator)
    }

    /// Preamble with the context block filled in.
    pub fn system_prompt(&self, retrieved: &RetrievalResult) -> String {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), self.context_block(retrieved));
        self.prompts
            .render_with_custom(self.prompts.rag.preamble(self.mode), &vars)
    }

    /// The system turn a fresh conversation starts from.
    pub fn initial_system_turn(&self) -> Turn {
        Turn::system(self.system_prompt(&RetrievalResult::default()))
    }

    /// The two-message exchange for a single question.
    pub fn assemble(&self, retrieved: &RetrievalResult, query: &str) -> Vec<Turn> {
        vec![Turn::system(self.system_prompt(retrieved)), Turn::user(query)]
    }
}
