//! Configuration module for Brosur.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    CacheSettings, ContextMode, CorpusSettings, EmbeddingSettings, GeneralSettings,
    PromptSettings, RagSettings, RetrySettings, ServerSettings, Settings,
};
