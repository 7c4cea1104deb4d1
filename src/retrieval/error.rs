use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::index::IndexError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error("query text is blank")]
    BlankQuery,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
