//! OpenAI client configuration with sensible defaults.

use crate::error::{FailureKind, Result};
use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use std::time::Duration;

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Classify an OpenAI client error for retry decisions.
pub fn classify_error(error: &OpenAIError) -> FailureKind {
    match error {
        OpenAIError::Reqwest(_) | OpenAIError::StreamError(_) => FailureKind::Transient,
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            if code == "rate_limit_exceeded" || kind == "server_error" || kind == "tokens" {
                FailureKind::Transient
            } else {
                FailureKind::Permanent
            }
        }
        OpenAIError::JSONDeserialize(_) => FailureKind::Malformed,
        _ => FailureKind::Permanent,
    }
}
