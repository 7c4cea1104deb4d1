use thiserror::Error;

use crate::config::ConfigError;
use crate::retrieval::RetrievalError;

/// Setup failures. A pipeline that has been built never fails a run; units degrade instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build retrieval index: {0}")]
    Retrieval(#[from] RetrievalError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
