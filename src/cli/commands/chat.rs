//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::BrosurError;
use crate::orchestrator::Orchestrator;
use crate::rag::{ChatSession, RagResponse};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// What the user typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Exit,
    Clear,
    Retry,
    Message(&'a str),
}

fn parse_input(line: &str) -> Option<Input<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    Some(match line.to_ascii_lowercase().as_str() {
        "exit" | "quit" => Input::Exit,
        "clear" => Input::Clear,
        "retry" => Input::Retry,
        _ => Input::Message(line),
    })
}

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let max_history_turns = settings.rag.max_history_turns;
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Indexing corpus...");
    let engine = orchestrator.build_engine(model.as_deref()).await;
    spinner.finish_and_clear();
    let engine = Arc::new(engine?);

    let mut session = ChatSession::new(engine).with_max_history_turns(max_history_turns);

    println!("\n{}", style("Brosur Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset the conversation.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let outcome = match parse_input(&line) {
            None => continue,
            Some(Input::Exit) => {
                Output::info("Goodbye!");
                break;
            }
            Some(Input::Clear) => {
                session.clear();
                Output::info("Conversation history cleared.");
                continue;
            }
            Some(Input::Retry) => {
                if session.pending_message().is_none() {
                    Output::warning("Nothing to retry.");
                    continue;
                }
                exchange(&mut session, None).await
            }
            Some(Input::Message(message)) => exchange(&mut session, Some(message)).await,
        };

        match outcome {
            Some(Ok(response)) => {
                println!("\n{} {}\n", style("Brosur:").cyan().bold(), response.reply);
            }
            Some(Err(e)) => {
                Output::error(&format!("Error: {}", e));
                if matches!(e, BrosurError::CompletionService { .. })
                    && session.pending_message().is_some()
                {
                    Output::info("Type 'retry' to resend your last message.");
                }
            }
            None => Output::warning("Cancelled."),
        }
    }

    Ok(())
}

/// Send a message (or retry the pending one). Returns `None` when cancelled with Ctrl+C.
async fn exchange(
    session: &mut ChatSession,
    message: Option<&str>,
) -> Option<crate::Result<RagResponse>> {
    let spinner = Output::spinner("Thinking...");

    let outcome = tokio::select! {
        result = async {
            match message {
                Some(message) => session.send(message).await,
                None => session.retry().await,
            }
        } => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    spinner.finish_and_clear();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   \n"), None);
        assert_eq!(parse_input("EXIT\n"), Some(Input::Exit));
        assert_eq!(parse_input("quit"), Some(Input::Exit));
        assert_eq!(parse_input(" clear "), Some(Input::Clear));
        assert_eq!(parse_input("retry"), Some(Input::Retry));
        assert_eq!(
            parse_input("  What does it cost?\n"),
            Some(Input::Message("What does it cost?"))
        );
    }
}
