//! Persistent embedding cache.
//!
//! Vectors are stored in SQLite keyed by `(sha256(text), model)`. Opening the
//! cache for a model drops every row written by a different model, so a model
//! change invalidates the cache explicitly instead of mixing vector spaces.

use super::Embedder;
use crate::error::{BrosurError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
    text_hash TEXT NOT NULL,
    model TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    vector BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (text_hash, model)
);
"#;

/// Summary of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Model the cache is bound to.
    pub model: String,
    /// Number of cached vectors.
    pub entries: usize,
}

/// SQLite-backed store of text embeddings for a single model.
pub struct EmbeddingCache {
    conn: Mutex<Connection>,
    model: String,
}

impl EmbeddingCache {
    /// Open (or create) the cache at `path`, bound to `model`.
    #[instrument(skip_all, fields(model = %model))]
    pub fn open(path: &Path, model: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let cache = Self::with_connection(conn, model)?;
        info!("Opened embedding cache at {:?}", path);
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory(model: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, model)
    }

    fn with_connection(conn: Connection, model: &str) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        let stale = conn.execute("DELETE FROM embeddings WHERE model != ?1", params![model])?;
        if stale > 0 {
            info!("Invalidated {} cached embeddings from other models", stale);
        }

        Ok(Self {
            conn: Mutex::new(conn),
            model: model.to_string(),
        })
    }

    /// The model this cache is bound to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Hash used as the cache key for a text.
    pub fn text_hash(text: &str) -> String {
        hex::encode(Sha256::digest(text.as_bytes()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| BrosurError::Cache(format!("Failed to acquire lock: {}", e)))
    }

    /// Look up a cached vector for `text`.
    pub fn get(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let conn = self.lock()?;
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT vector FROM embeddings WHERE text_hash = ?1 AND model = ?2",
                params![Self::text_hash(text), self.model],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bytes.map(|b| bytes_to_embedding(&b)))
    }

    /// Store vectors for the given texts in one transaction.
    pub fn put_many(&self, entries: &[(&str, &[f32])]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        for (text, vector) in entries {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO embeddings (text_hash, model, dimensions, vector, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    Self::text_hash(text),
                    self.model,
                    vector.len() as i64,
                    embedding_to_bytes(vector),
                    now,
                ],
            )?;
        }

        tx.commit()?;
        debug!("Cached {} embeddings", entries.len());
        Ok(entries.len())
    }

    /// Count cached vectors.
    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.lock()?;
        let entries: i64 = conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE model = ?1",
            params![self.model],
            |row| row.get(0),
        )?;
        Ok(CacheStats {
            model: self.model.clone(),
            entries: entries as usize,
        })
    }

    /// Remove every cached vector.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM embeddings", [])?;
        info!("Cleared {} cached embeddings", removed);
        Ok(removed)
    }
}

/// Serialize embedding to bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

/// Map an error index within the miss list back to the caller's position.
fn to_caller_position(error: BrosurError, misses: &[usize]) -> BrosurError {
    match error {
        BrosurError::EmbeddingService {
            chunk_index,
            kind,
            message,
        } => BrosurError::EmbeddingService {
            chunk_index: chunk_index.and_then(|j| misses.get(j).copied()),
            kind,
            message,
        },
        other => other,
    }
}

/// Embedder that serves known texts from an [`EmbeddingCache`] and forwards
/// misses to an inner embedder.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Arc<EmbeddingCache>,
}

impl CachedEmbedder {
    /// Wrap `inner`; the cache must be bound to the same model.
    pub fn new(inner: Arc<dyn Embedder>, cache: Arc<EmbeddingCache>) -> Result<Self> {
        if inner.model_id() != cache.model() {
            return Err(BrosurError::ModelMismatch {
                index_model: cache.model().to_string(),
                embedder_model: inner.model_id().to_string(),
            });
        }
        Ok(Self { inner, cache })
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let dimensions = self.inner.dimensions();
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut misses: Vec<usize> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            match self.cache.get(text)? {
                Some(vector) if vector.len() == dimensions => results.push(Some(vector)),
                _ => {
                    results.push(None);
                    misses.push(i);
                }
            }
        }

        debug!("Cache hits: {}, misses: {}", texts.len() - misses.len(), misses.len());

        if !misses.is_empty() {
            let miss_texts: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();

            let fresh = self
                .inner
                .embed_batch(&miss_texts)
                .await
                .map_err(|e| to_caller_position(e, &misses))?;
            super::validate_embeddings(miss_texts.len(), dimensions, &fresh)
                .map_err(|e| to_caller_position(e, &misses))?;

            let entries: Vec<(&str, &[f32])> = miss_texts
                .iter()
                .zip(fresh.iter())
                .map(|(t, v)| (t.as_str(), v.as_slice()))
                .collect();
            self.cache.put_many(&entries)?;

            for (i, vector) in misses.into_iter().zip(fresh) {
                results[i] = Some(vector);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
