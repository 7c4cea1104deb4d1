//! [`JudgmentOracle`] backed by the `genai` multi-provider chat client.

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use tracing::debug;

use super::error::OracleError;
use super::{JudgmentOracle, OracleRequest};
use crate::config::EngineConfig;

/// Chat-completion oracle. The model name picks the provider (`gpt-*`, `claude-*`,
/// `gemini-*`, Ollama models, ...); credentials come from the provider's usual
/// environment variable, e.g. `OPENAI_API_KEY`.
#[derive(Clone)]
pub struct GenaiOracle {
    client: Client,
    model: String,
}

impl std::fmt::Debug for GenaiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiOracle")
            .field("model", &self.model)
            .finish()
    }
}

impl GenaiOracle {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.oracle_model.clone())
    }

    fn classify_error(err: genai::Error) -> OracleError {
        let reason = err.to_string();
        let lowered = reason.to_lowercase();
        if lowered.contains("401")
            || lowered.contains("403")
            || lowered.contains("unauthorized")
            || lowered.contains("api key")
        {
            OracleError::Unauthorized { reason }
        } else {
            OracleError::Provider { reason }
        }
    }
}

#[async_trait]
impl JudgmentOracle for GenaiOracle {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn judge(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(request.prompt.clone()));

        let options = ChatOptions::default()
            .with_temperature(request.temperature)
            .with_max_tokens(request.max_tokens);

        debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            "Calling judgment oracle"
        );

        let response = self
            .client
            .exec_chat(&self.model, ChatRequest::new(messages), Some(&options))
            .await
            .map_err(Self::classify_error)?;

        let text = response.first_text().unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(text)
    }
}
