//! Corpus chunking: turning scraped page text into retrievable passages.

mod marker;

pub use marker::MarkerChunker;

use crate::error::{BrosurError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

/// A trimmed, non-empty passage of corpus text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk within the corpus.
    pub position: usize,
    /// Text content of this chunk.
    pub text: String,
    /// Source of the page this chunk came from (the page header, usually a URL).
    pub source: Option<String>,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            source: None,
        }
    }

    /// Attach the page source.
    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    /// Single-line preview of the chunk for display.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

/// Trait for corpus chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split corpus text into ordered chunks.
    fn chunk(&self, corpus: &str) -> Vec<Chunk>;
}

/// Read the corpus file.
///
/// Any read failure (missing file, permissions, invalid UTF-8) is reported as
/// [`BrosurError::CorpusUnavailable`].
#[instrument]
pub fn load_corpus(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|source| BrosurError::CorpusUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loaded corpus ({} bytes)", text.len());
    Ok(text)
}
