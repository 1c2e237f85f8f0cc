//! Language-model completion.

use super::{Role, Turn};
use crate::error::{BrosurError, FailureKind, Result};
use crate::openai::{classify_error, create_client_with_timeout};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Trait for chat completion backends: role-tagged messages in, one reply out.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Produce the assistant reply for `messages`.
    async fn complete(&self, messages: &[Turn]) -> Result<String>;
}

/// OpenAI chat-completions backend.
pub struct OpenAICompleter {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAICompleter {
    /// Create a completer for `model` with the given request timeout.
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature: None,
        })
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Model used for completions.
    pub fn model(&self) -> &str {
        &self.model
    }
}

fn to_request_message(turn: &Turn) -> Result<ChatCompletionRequestMessage> {
    let invalid = |e: async_openai::error::OpenAIError| {
        BrosurError::completion(FailureKind::Permanent, format!("Invalid message: {}", e))
    };

    let message: ChatCompletionRequestMessage = match turn.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(turn.content.clone())
            .build()
            .map_err(invalid)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(turn.content.clone())
            .build()
            .map_err(invalid)?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(turn.content.clone())
            .build()
            .map_err(invalid)?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl Completer for OpenAICompleter {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[Turn]) -> Result<String> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if let Some(temperature) = self.temperature {
            args.temperature(temperature);
        }
        let request = args.build().map_err(|e| {
            BrosurError::completion(FailureKind::Permanent, format!("Failed to build request: {}", e))
        })?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            BrosurError::completion(classify_error(&e), format!("Failed to generate response: {}", e))
        })?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| BrosurError::completion(FailureKind::Malformed, "Empty response from LLM"))?
            .clone();

        debug!("Received {} characters", answer.len());
        Ok(answer)
    }
}
