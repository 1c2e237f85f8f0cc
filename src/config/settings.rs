//! Configuration settings for Brosur.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub cache: CacheSettings,
    pub rag: RagSettings,
    pub retry: RetrySettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.brosur".to_string(),
        }
    }
}

/// Where the scraped corpus lives and how it is delimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Path to the scraped corpus text file.
    pub path: String,
    /// Literal marker at the start of each scraped page.
    pub page_marker: String,
    /// Literal marker for forced section breaks within a page.
    pub section_marker: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            path: "website_and_brosur_scraped.txt".to_string(),
            page_marker: "--- https".to_string(),
            section_marker: "NEXT".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Texts per embedding request (1 = one request per chunk).
    pub batch_size: usize,
    /// Maximum embedding requests in flight while building the index.
    pub max_concurrent: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 100,
            max_concurrent: 4,
        }
    }
}

/// Persistent embedding cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Reuse chunk embeddings across restarts.
    pub enabled: bool,
    /// Path to the SQLite cache database.
    pub sqlite_path: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sqlite_path: "~/.brosur/embeddings.db".to_string(),
        }
    }
}

/// How the assistant treats questions the retrieved context cannot answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Refuse or admit ignorance when the context lacks the answer.
    ContextOnly,
    /// Fall back to general knowledge when the context lacks the answer.
    #[default]
    ContextPreferred,
}

impl std::str::FromStr for ContextMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "context_only" => Ok(ContextMode::ContextOnly),
            "context_preferred" => Ok(ContextMode::ContextPreferred),
            _ => Err(format!(
                "Unknown context mode '{}' (expected context_only or context_preferred)",
                s
            )),
        }
    }
}

impl std::fmt::Display for ContextMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextMode::ContextOnly => write!(f, "context_only"),
            ContextMode::ContextPreferred => write!(f, "context_preferred"),
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Context policy for the system prompt.
    pub mode: ContextMode,
    /// Sampling temperature (model default when unset).
    pub temperature: Option<f32>,
    /// User/assistant turns kept in an interactive session.
    pub max_history_turns: usize,
    /// Timeout for each OpenAI request, in seconds.
    pub request_timeout_secs: u64,
    /// Delimiter placed between retrieved chunks in the context block.
    pub context_separator: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            top_k: 10,
            mode: ContextMode::ContextPreferred,
            temperature: None,
            max_history_turns: 20,
            request_timeout_secs: 300,
            context_separator: "\n\n".to_string(),
        }
    }
}

/// Retry settings applied to both embedding and completion calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per call (1 disables retrying).
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound for the delay between retries, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
        }
    }
}

impl RetrySettings {
    /// Build the retry policy described by these settings.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Accept CORS requests from any origin.
    pub cors_allow_any_origin: bool,
    /// Include similarity scores next to chunk texts in responses.
    pub include_scores: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_allow_any_origin: true,
            include_scores: true,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BrosurError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brosur")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded corpus path.
    pub fn corpus_path(&self) -> PathBuf {
        Self::expand_path(&self.corpus.path)
    }

    /// Get the expanded embedding cache path.
    pub fn cache_path(&self) -> PathBuf {
        Self::expand_path(&self.cache.sqlite_path)
    }

    /// Timeout applied to each OpenAI request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.rag.request_timeout_secs)
    }
}
