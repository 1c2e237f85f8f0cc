//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command. Ranks chunks against the query without calling the LLM.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Indexing corpus...");
    let retriever = match orchestrator.build_retriever(orchestrator.embedder()?).await {
        Ok(retriever) => retriever,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    spinner.set_message("Searching...");
    let results = retriever.retrieve(query, limit).await;
    spinner.finish_and_clear();
    let results = results?;

    if results.is_empty() {
        Output::warning("No matching chunks found.");
        return Ok(());
    }

    Output::header(&format!("Top {} chunks for \"{}\"", results.len(), query));
    for (rank, scored) in results.chunks.iter().enumerate() {
        Output::scored_chunk(rank + 1, scored);
    }
    println!();

    Ok(())
}
