//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Indexing corpus...");
    let engine = match orchestrator.build_engine(model.as_deref()).await {
        Ok(engine) => engine,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to build index: {}", e));
            return Err(e.into());
        }
    };

    spinner.set_message("Thinking...");

    match engine.answer(question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.reply);

            if !response.retrieved.is_empty() {
                Output::header("Sources");
                for (rank, scored) in response.retrieved.chunks.iter().enumerate() {
                    Output::scored_chunk(rank + 1, scored);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
