use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryableError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle provider error: {reason}")]
    Provider { reason: String },

    #[error("oracle rejected credentials: {reason}")]
    Unauthorized { reason: String },

    #[error("oracle call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("oracle returned no text")]
    EmptyResponse,
}

impl RetryableError for OracleError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::Provider { .. } | OracleError::Timeout { .. } | OracleError::EmptyResponse
        )
    }

    fn timed_out(after: Duration) -> Self {
        OracleError::Timeout { after }
    }
}
