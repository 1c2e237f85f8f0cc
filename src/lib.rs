//! Brosur - retrieval-augmented chat over a scraped product corpus
//!
//! Brosur turns a flat text file of scraped website and brochure content into
//! a semantic index, and answers questions about it with a language model that
//! is given the most relevant passages as context.
//!
//! # Overview
//!
//! Brosur allows you to:
//! - Split the corpus into chunks on page and section markers
//! - Embed every chunk once, with an optional on-disk embedding cache
//! - Chat interactively, or ask one-off questions, grounded on the corpus
//! - Serve the assistant over HTTP (`POST /chat`)
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `chunking` - Corpus loading and marker-based chunking
//! - `embedding` - Embedding generation and caching
//! - `index` - Immutable chunk/vector index
//! - `retrieval` - Cosine-similarity top-K retrieval
//! - `rag` - Prompt assembly, completion, sessions
//! - `retry` - Retry policy for external calls
//! - `orchestrator` - Startup pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use brosur::config::Settings;
//! use brosur::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let engine = orchestrator.build_engine(None).await?;
//!     let response = engine.answer("What is in the starter kit?").await?;
//!     println!("{}", response.reply);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retrieval;
pub mod retry;

pub use error::{BrosurError, Result};
