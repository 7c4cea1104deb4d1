//! OpenAI-compatible `/embeddings` HTTP provider.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::EmbeddingError;
use super::provider::{EmbeddingProvider, check_batch};
use crate::config::EngineConfig;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedder backed by any OpenAI-compatible API (OpenAI, Ollama, vLLM, LiteLLM).
///
/// Timeouts and retries are applied by the caller through
/// [`call_with_retry`](crate::retry::call_with_retry); one `embed` is one HTTP request.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl OpenAiEmbedder {
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, EmbeddingError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model id must not be empty".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", endpoint.trim_end_matches('/')),
            model,
            api_key,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, EmbeddingError> {
        Self::new(
            &config.embedding_endpoint,
            config.embedding_model.clone(),
            config.api_key.clone(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), model = %self.model, "Requesting embeddings");

        let mut request = self.client.post(&self.url).json(&EmbedRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EmbeddingError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse = response.json().await?;
        let vectors = order_by_index(parsed.data, texts.len())?;
        check_batch(texts.len(), &vectors)?;
        Ok(vectors)
    }
}

/// Providers may return `data` out of order; `index` is authoritative.
fn order_by_index(data: Vec<EmbedData>, expected: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: data.len(),
        });
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        let slot = slots
            .get_mut(item.index)
            .ok_or_else(|| EmbeddingError::InvalidResponse {
                reason: format!("index {} out of range for {} inputs", item.index, expected),
            })?;
        if slot.replace(item.embedding).is_some() {
            return Err(EmbeddingError::InvalidResponse {
                reason: format!("index {} returned twice", item.index),
            });
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| EmbeddingError::InvalidResponse {
                reason: format!("missing vector for input {}", i),
            })
        })
        .collect()
}
