//! Chunks command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;

/// Run the chunks command.
pub fn run_chunks(limit: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Chunk, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let chunks = orchestrator.load_chunks()?;

    Output::header(&format!("{} chunks", chunks.len()));
    for chunk in chunks.iter().take(limit.unwrap_or(usize::MAX)) {
        println!(
            "\n{} {}",
            style(format!("[{}]", chunk.position)).cyan().bold(),
            chunk.preview(120)
        );
        if let Some(source) = &chunk.source {
            println!("    {}", style(source).dim());
        }
    }

    if let Some(limit) = limit {
        if chunks.len() > limit {
            println!();
            Output::info(&format!("... {} more", chunks.len() - limit));
        }
    }

    Ok(())
}
