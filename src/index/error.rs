use thiserror::Error;

/// Structural contract violations. Fatal to the call, never to the index state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("search on an empty index")]
    EmptyIndex,

    #[error("zero-dimension vector")]
    ZeroDimension,
}

/// Convenience result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
