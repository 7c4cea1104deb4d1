//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `REQLENS_*` environment variables; the
//! provider API key is read from `OPENAI_API_KEY`. Build one [`EngineConfig`] at startup
//! and pass it by reference into the engine components.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_CONFLICT_TOP_K, DEFAULT_EMBEDDING_BATCH_SIZE,
    DEFAULT_EMBEDDING_ENDPOINT, DEFAULT_EMBEDDING_MODEL, DEFAULT_INITIAL_BACKOFF_MS,
    DEFAULT_KNOWLEDGE_TOP_K, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF_MS,
    DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_ORACLE_MAX_TOKENS, DEFAULT_ORACLE_MODEL,
    DEFAULT_TIMEOUT_SECS,
};
use crate::retry::RetryPolicy;

/// Engine configuration loaded from environment variables.
///
/// Use [`EngineConfig::from_env`] to read `REQLENS_*` overrides on top of defaults.
#[derive(Clone)]
pub struct EngineConfig {
    /// OpenAI-compatible API base URL for embeddings.
    pub embedding_endpoint: String,

    /// Embedding model identifier. Also tags every cached vector.
    pub embedding_model: String,

    /// Texts per embedding request. Default: `64`.
    pub embedding_batch_size: usize,

    /// Judgment model identifier (resolved by `genai`).
    pub oracle_model: String,

    /// Upper bound on oracle output tokens. Default: `512`.
    pub oracle_max_tokens: u32,

    /// Provider API key. Never printed.
    pub api_key: Option<String>,

    /// Per-call timeout for provider requests. Default: `30s`.
    pub timeout: Duration,

    /// Attempts per provider call, first try included. Default: `3`.
    pub max_attempts: u32,

    /// First retry delay; doubles per attempt. Default: `500ms`.
    pub initial_backoff: Duration,

    /// Units of work in flight at once. Default: `4`.
    pub concurrency: usize,

    /// Candidates retrieved per new acceptance criterion. Default: `5`.
    pub conflict_top_k: usize,

    /// Knowledge passages retrieved per issue x story pair. Default: `3`.
    pub knowledge_top_k: usize,

    /// Character budget for evidence context. Default: `8000`.
    pub max_context_chars: usize,

    /// Embedding cache file. `None` disables persistence.
    pub cache_path: Option<PathBuf>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("embedding_endpoint", &self.embedding_endpoint)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_batch_size", &self.embedding_batch_size)
            .field("oracle_model", &self.oracle_model)
            .field("oracle_max_tokens", &self.oracle_max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("concurrency", &self.concurrency)
            .field("conflict_top_k", &self.conflict_top_k)
            .field("knowledge_top_k", &self.knowledge_top_k)
            .field("max_context_chars", &self.max_context_chars)
            .field("cache_path", &self.cache_path)
            .finish()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            oracle_model: DEFAULT_ORACLE_MODEL.to_string(),
            oracle_max_tokens: DEFAULT_ORACLE_MAX_TOKENS,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            concurrency: DEFAULT_CONCURRENCY,
            conflict_top_k: DEFAULT_CONFLICT_TOP_K,
            knowledge_top_k: DEFAULT_KNOWLEDGE_TOP_K,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            cache_path: None,
        }
    }
}

impl EngineConfig {
    const ENV_EMBEDDING_ENDPOINT: &'static str = "REQLENS_EMBEDDING_ENDPOINT";
    const ENV_EMBEDDING_MODEL: &'static str = "REQLENS_EMBEDDING_MODEL";
    const ENV_EMBEDDING_BATCH_SIZE: &'static str = "REQLENS_EMBEDDING_BATCH_SIZE";
    const ENV_ORACLE_MODEL: &'static str = "REQLENS_ORACLE_MODEL";
    const ENV_ORACLE_MAX_TOKENS: &'static str = "REQLENS_ORACLE_MAX_TOKENS";
    const ENV_API_KEY: &'static str = "OPENAI_API_KEY";
    const ENV_TIMEOUT_SECS: &'static str = "REQLENS_TIMEOUT_SECS";
    const ENV_MAX_ATTEMPTS: &'static str = "REQLENS_MAX_ATTEMPTS";
    const ENV_BACKOFF_MS: &'static str = "REQLENS_BACKOFF_MS";
    const ENV_CONCURRENCY: &'static str = "REQLENS_CONCURRENCY";
    const ENV_TOP_K: &'static str = "REQLENS_TOP_K";
    const ENV_KNOWLEDGE_TOP_K: &'static str = "REQLENS_KNOWLEDGE_TOP_K";
    const ENV_MAX_CONTEXT_CHARS: &'static str = "REQLENS_MAX_CONTEXT_CHARS";
    const ENV_CACHE_PATH: &'static str = "REQLENS_CACHE_PATH";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            embedding_endpoint: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_ENDPOINT,
                defaults.embedding_endpoint,
            ),
            embedding_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding_model,
            ),
            embedding_batch_size: Self::parse_number_from_env(
                Self::ENV_EMBEDDING_BATCH_SIZE,
                defaults.embedding_batch_size,
            )?,
            oracle_model: Self::parse_string_from_env(
                Self::ENV_ORACLE_MODEL,
                defaults.oracle_model,
            ),
            oracle_max_tokens: Self::parse_number_from_env(
                Self::ENV_ORACLE_MAX_TOKENS,
                defaults.oracle_max_tokens,
            )?,
            api_key: Self::parse_optional_string_from_env(Self::ENV_API_KEY),
            timeout: Duration::from_secs(Self::parse_number_from_env(
                Self::ENV_TIMEOUT_SECS,
                defaults.timeout.as_secs(),
            )?),
            max_attempts: Self::parse_number_from_env(
                Self::ENV_MAX_ATTEMPTS,
                defaults.max_attempts,
            )?,
            initial_backoff: Duration::from_millis(Self::parse_number_from_env(
                Self::ENV_BACKOFF_MS,
                defaults.initial_backoff.as_millis() as u64,
            )?),
            concurrency: Self::parse_number_from_env(Self::ENV_CONCURRENCY, defaults.concurrency)?,
            conflict_top_k: Self::parse_number_from_env(Self::ENV_TOP_K, defaults.conflict_top_k)?,
            knowledge_top_k: Self::parse_number_from_env(
                Self::ENV_KNOWLEDGE_TOP_K,
                defaults.knowledge_top_k,
            )?,
            max_context_chars: Self::parse_number_from_env(
                Self::ENV_MAX_CONTEXT_CHARS,
                defaults.max_context_chars,
            )?,
            cache_path: Self::parse_optional_string_from_env(Self::ENV_CACHE_PATH)
                .map(PathBuf::from),
        })
    }

    /// Validates ranges and paths (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.embedding_endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint {
                value: self.embedding_endpoint.clone(),
            });
        }

        Self::require_non_empty(Self::ENV_EMBEDDING_MODEL, &self.embedding_model)?;
        Self::require_non_empty(Self::ENV_ORACLE_MODEL, &self.oracle_model)?;

        Self::require_positive(Self::ENV_EMBEDDING_BATCH_SIZE, self.embedding_batch_size)?;
        Self::require_positive(Self::ENV_ORACLE_MAX_TOKENS, self.oracle_max_tokens as usize)?;
        Self::require_positive(Self::ENV_MAX_ATTEMPTS, self.max_attempts as usize)?;
        Self::require_positive(Self::ENV_CONCURRENCY, self.concurrency)?;
        Self::require_positive(Self::ENV_TOP_K, self.conflict_top_k)?;
        Self::require_positive(Self::ENV_KNOWLEDGE_TOP_K, self.knowledge_top_k)?;
        Self::require_positive(Self::ENV_MAX_CONTEXT_CHARS, self.max_context_chars)?;

        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_TIMEOUT_SECS,
                reason: "timeout must be greater than zero".to_string(),
            });
        }

        if let Some(parent) = self
            .cache_path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
        {
            if parent.exists() && !parent.is_dir() {
                return Err(ConfigError::NotADirectory {
                    path: parent.to_path_buf(),
                });
            }
        }

        Ok(())
    }

    /// Retry/timeout policy for every provider call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: self.initial_backoff,
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS).max(self.initial_backoff),
            multiplier: 2,
            timeout: self.timeout,
        }
    }

    fn require_non_empty(name: &'static str, value: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name,
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn require_positive(name: &'static str, value: usize) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                name,
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_number_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr<Err = std::num::ParseIntError>,
    {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value: value.clone(),
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }
}
