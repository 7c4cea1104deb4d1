//! Judgment oracle seam: a structured prompt in, free text out.
//!
//! The oracle is a black box and not deterministic, even at temperature zero.

mod chat;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use chat::GenaiOracle;
pub use error::OracleError;
#[cfg(any(test, feature = "mock"))]
pub use mock::ScriptedOracle;

use async_trait::async_trait;
use serde::Serialize;

use crate::constants::DEFAULT_ORACLE_MAX_TOKENS;

/// One oracle call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl OracleRequest {
    /// Temperature-zero request, the only mode the classification engine uses.
    pub fn deterministic(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: DEFAULT_ORACLE_MAX_TOKENS,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
pub trait JudgmentOracle: Send + Sync {
    fn model_id(&self) -> &str;

    async fn judge(&self, request: &OracleRequest) -> Result<String, OracleError>;
}
