//! Interactive chat sessions.
//!
//! A session owns its transcript and shares the engine (and through it the
//! index) with every other session. The transcript is only touched after the
//! external calls for a turn have finished, so an abandoned request leaves it
//! as it was.

use super::{RagEngine, RagResponse, Role, Turn};
use crate::error::{BrosurError, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A conversation with its own transcript.
pub struct ChatSession {
    engine: Arc<RagEngine>,
    transcript: Vec<Turn>,
    max_history_turns: usize,
}

impl ChatSession {
    /// Start a session whose transcript holds only the system turn.
    pub fn new(engine: Arc<RagEngine>) -> Self {
        let transcript = vec![engine.assembler().initial_system_turn()];
        Self {
            engine,
            transcript,
            max_history_turns: 20,
        }
    }

    /// Limit how many user/assistant turns are kept.
    pub fn with_max_history_turns(mut self, max_history_turns: usize) -> Self {
        self.max_history_turns = max_history_turns.max(2);
        self
    }

    /// The transcript, starting with the system turn.
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// A user message still waiting for a reply after a completion failure.
    pub fn pending_message(&self) -> Option<&str> {
        self.transcript
            .last()
            .filter(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }

    /// Reset to the initial system-only state. The index is untouched.
    pub fn clear(&mut self) {
        self.transcript.truncate(1);
        info!("Conversation history cleared");
    }

    /// Send a user message and record the exchange.
    ///
    /// A failed query embedding leaves the transcript unchanged. A failed
    /// completion records the user turn without a reply, so [`retry`] can
    /// resend it.
    ///
    /// [`retry`]: ChatSession::retry
    #[instrument(skip(self), fields(message = %message))]
    pub async fn send(&mut self, message: &str) -> Result<RagResponse> {
        if self.pending_message().is_some() {
            // The unanswered turn is superseded by the new message.
            warn!("Dropping unanswered message before sending a new one");
        }
        self.exchange(message, false).await
    }

    /// Resend the pending user message after a completion failure.
    pub async fn retry(&mut self) -> Result<RagResponse> {
        let message = self
            .pending_message()
            .ok_or_else(|| BrosurError::InvalidInput("No unanswered message to retry".to_string()))?
            .to_string();
        self.exchange(&message, true).await
    }

    async fn exchange(&mut self, message: &str, is_retry: bool) -> Result<RagResponse> {
        let retrieved = self.engine.retrieve(message).await?;

        let history = self.history();
        let system = Turn::system(self.engine.assembler().system_prompt(&retrieved));
        let user = Turn::user(message);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(system);
        messages.extend_from_slice(history);
        messages.push(user.clone());

        debug!("Sending {} messages", messages.len());
        let completion = self.engine.complete(&messages).await;

        if !is_retry {
            self.drop_pending();
            self.transcript.push(user);
        }

        let reply = completion?;
        self.transcript.push(Turn::assistant(reply.clone()));
        self.trim_history();

        Ok(RagResponse { reply, retrieved })
    }

    /// Prior user/assistant turns to send, excluding any unanswered message.
    fn history(&self) -> &[Turn] {
        let mut end = self.transcript.len();
        if self.pending_message().is_some() {
            end -= 1;
        }
        &self.transcript[1..end]
    }

    fn drop_pending(&mut self) {
        if self.pending_message().is_some() {
            self.transcript.pop();
        }
    }

    /// Keep the system turn and the most recent exchanges.
    fn trim_history(&mut self) {
        let turns = self.transcript.len() - 1;
        if turns > self.max_history_turns {
            let mut start = 1 + turns - self.max_history_turns;
            // Never start the kept history with a reply.
            if self.transcript[start].role == Role::Assistant {
                start += 1;
            }
            self.transcript.drain(1..start);
        }
    }
}
