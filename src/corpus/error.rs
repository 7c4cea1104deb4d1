use thiserror::Error;

use super::types::ArtifactId;

/// Malformed or unusable input artifacts.
///
/// These never abort a batch: the offending artifact is skipped with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorpusError {
    /// Artifact text is empty or whitespace only.
    #[error("artifact '{id}' has blank text")]
    BlankText { id: ArtifactId },

    /// Record body is shorter than the corpus policy minimum.
    #[error("artifact '{id}' is too short: {len} chars (minimum {min})")]
    TooShort { id: ArtifactId, len: usize, min: usize },

    /// An artifact with this id is already in the corpus.
    #[error("duplicate artifact id '{id}'")]
    DuplicateId { id: ArtifactId },
}

/// Convenience result type for corpus operations.
pub type CorpusResult<T> = Result<T, CorpusError>;
