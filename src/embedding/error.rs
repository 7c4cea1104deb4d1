use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryableError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbeddingError {
    #[error("embedding transport failed: {reason}")]
    Transport { reason: String },

    #[error("embedding provider rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("embedding provider rate limited the request")]
    RateLimited,

    #[error("embedding provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embedding call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("invalid embedding response: {reason}")]
    InvalidResponse { reason: String },

    /// All-or-nothing: a partial batch is never returned.
    #[error("embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },

    #[error("invalid embedding configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl RetryableError for EmbeddingError {
    fn is_transient(&self) -> bool {
        match self {
            EmbeddingError::Transport { .. }
            | EmbeddingError::RateLimited
            | EmbeddingError::Timeout { .. } => true,
            EmbeddingError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        EmbeddingError::Timeout { after }
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EmbeddingError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            EmbeddingError::Transport {
                reason: err.to_string(),
            }
        }
    }
}
