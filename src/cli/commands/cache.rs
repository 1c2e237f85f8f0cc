//! Cache command implementation.

use crate::cli::{CacheAction, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the cache command.
pub fn run_cache(action: &CacheAction, settings: Settings) -> Result<()> {
    let path = settings.cache_path();
    let orchestrator = Orchestrator::new(settings)?;

    match action {
        CacheAction::Stats => {
            let stats = orchestrator.open_cache()?.stats()?;
            Output::header("Embedding cache");
            Output::kv("Path", &path.display().to_string());
            Output::kv("Model", &stats.model);
            Output::kv("Entries", &stats.entries.to_string());
        }

        CacheAction::Clear => {
            let removed = orchestrator.open_cache()?.clear()?;
            Output::success(&format!("Removed {} cached embeddings.", removed));
        }
    }

    Ok(())
}
