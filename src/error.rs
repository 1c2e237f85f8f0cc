//! Error types for Brosur.

use std::path::PathBuf;
use thiserror::Error;

/// How an external service call failed.
///
/// Retry policies only act on [`FailureKind::Transient`] failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network trouble, timeouts, rate limiting or server-side errors.
    Transient,
    /// The request itself was rejected (bad key, invalid input, unknown model).
    Permanent,
    /// The service answered, but with data we cannot use.
    Malformed,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Permanent => write!(f, "permanent"),
            FailureKind::Malformed => write!(f, "malformed response"),
        }
    }
}

/// Library-level error type for Brosur operations.
#[derive(Error, Debug)]
pub enum BrosurError {
    #[error("Corpus unavailable at {path:?}: {source}")]
    CorpusUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedding service error{} ({kind}): {message}", at_chunk(.chunk_index))]
    EmbeddingService {
        chunk_index: Option<usize>,
        kind: FailureKind,
        message: String,
    },

    #[error("Completion service error ({kind}): {message}")]
    CompletionService { kind: FailureKind, message: String },

    #[error("Embedder model '{embedder_model}' does not match index model '{index_model}'")]
    ModelMismatch {
        index_model: String,
        embedder_model: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding cache error: {0}")]
    Cache(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

fn at_chunk(chunk_index: &Option<usize>) -> String {
    match chunk_index {
        Some(i) => format!(" at chunk {}", i),
        None => String::new(),
    }
}

impl BrosurError {
    /// Build an embedding error that is not tied to a particular chunk.
    pub fn embedding(kind: FailureKind, message: impl Into<String>) -> Self {
        BrosurError::EmbeddingService {
            chunk_index: None,
            kind,
            message: message.into(),
        }
    }

    /// Build a completion error.
    pub fn completion(kind: FailureKind, message: impl Into<String>) -> Self {
        BrosurError::CompletionService {
            kind,
            message: message.into(),
        }
    }

    /// Whether retrying the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrosurError::EmbeddingService {
                kind: FailureKind::Transient,
                ..
            } | BrosurError::CompletionService {
                kind: FailureKind::Transient,
                ..
            }
        )
    }

    /// Attach (or shift) the chunk position of an embedding failure.
    ///
    /// `offset` is the position of the first text of the failed call within the
    /// caller's sequence. Errors carrying a call-relative index are shifted by it;
    /// errors without one are pinned to `offset`. Other errors pass through.
    pub fn at_chunk_offset(self, offset: usize) -> Self {
        match self {
            BrosurError::EmbeddingService {
                chunk_index,
                kind,
                message,
            } => BrosurError::EmbeddingService {
                chunk_index: Some(chunk_index.map_or(offset, |i| offset + i)),
                kind,
                message,
            },
            other => other,
        }
    }
}

/// Result type alias for Brosur operations.
pub type Result<T> = std::result::Result<T, BrosurError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_display_includes_chunk() {
        let err = BrosurError::embedding(FailureKind::Transient, "timed out").at_chunk_offset(2);
        assert_eq!(
            err.to_string(),
            "Embedding service error at chunk 2 (transient): timed out"
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_chunk_offset_shifts_relative_index() {
        let err = BrosurError::EmbeddingService {
            chunk_index: Some(1),
            kind: FailureKind::Malformed,
            message: "empty vector".to_string(),
        }
        .at_chunk_offset(100);

        match err {
            BrosurError::EmbeddingService { chunk_index, .. } => {
                assert_eq!(chunk_index, Some(101))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_permanent_failures_are_not_transient() {
        let err = BrosurError::completion(FailureKind::Permanent, "bad key");
        assert!(!err.is_transient());
        assert!(!BrosurError::Config("x".to_string()).is_transient());
    }
}
