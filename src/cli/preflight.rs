//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway through index construction.

use crate::config::Settings;
use crate::error::{BrosurError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Chunking only needs the corpus.
    Chunk,
    /// Building the index and answering needs the corpus and an API key.
    Answer,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_corpus(settings)?;
    match operation {
        Operation::Chunk => {}
        Operation::Answer => check_api_key()?,
    }
    Ok(())
}

/// Check that the corpus file exists.
fn check_corpus(settings: &Settings) -> Result<()> {
    let path = settings.corpus_path();
    if path.is_file() {
        Ok(())
    } else {
        Err(BrosurError::CorpusUnavailable {
            path,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "corpus file not found"),
        })
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(BrosurError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(BrosurError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_corpus_fails_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.corpus.path = dir.path().join("nope.txt").to_string_lossy().to_string();

        assert!(matches!(
            check(Operation::Chunk, &settings),
            Err(BrosurError::CorpusUnavailable { .. })
        ));
    }

    #[test]
    fn test_chunk_needs_only_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, "text").unwrap();

        let mut settings = Settings::default();
        settings.corpus.path = path.to_string_lossy().to_string();
        assert!(check(Operation::Chunk, &settings).is_ok());
    }
}
