//! CLI module for Brosur.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::{ContextMode, Settings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Brosur - chat with a scraped product corpus
///
/// Builds a semantic index over scraped website and brochure text and answers
/// questions about it with a language model.
#[derive(Parser, Debug)]
#[command(name = "brosur")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to the corpus file (overrides the configuration)
    #[arg(long, global = true, env = "BROSUR_CORPUS")]
    pub corpus: Option<String>,

    /// Context policy: context_only or context_preferred (overrides the configuration)
    #[arg(long, global = true)]
    pub mode: Option<ContextMode>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The configuration file in use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(Settings::default_config_path)
    }

    /// Settings for this run: `file` with command-line overrides applied.
    pub fn effective_settings(&self, file: &Settings) -> Settings {
        let mut settings = file.clone();
        if let Some(corpus) = &self.corpus {
            settings.corpus.path = corpus.clone();
        }
        if let Some(mode) = self.mode {
            settings.rag.mode = mode;
        }
        settings
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show the corpus chunks most similar to a query
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List the chunks the corpus splits into
    Chunks {
        /// Show only the first N chunks
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides the configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage the embedding cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show how many embeddings are cached
    Stats,

    /// Delete every cached embedding
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init,

    /// Show configuration file path
    Path,
}
