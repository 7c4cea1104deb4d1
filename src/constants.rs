//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants from primary ones to avoid drift.
//!
//! # Dimension Invariants
//!
//! The embedding dimension is decided by the configured provider, not at compile time.
//! Every vector that enters one [`VectorIndex`](crate::index::VectorIndex) must share a
//! single dimension. Use [`validate_embedding_dim`] at module boundaries (provider output,
//! cache reuse, index insertion) to catch mismatches early.

/// Default embedding model (OpenAI-compatible endpoint).
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default judgment model.
pub const DEFAULT_ORACLE_MODEL: &str = "gpt-4o-mini";

/// Upper bound on oracle output tokens.
pub const DEFAULT_ORACLE_MAX_TOKENS: u32 = 512;

/// Texts sent per embedding request.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 64;

/// Candidates retrieved for the conflict pipeline.
pub const DEFAULT_CONFLICT_TOP_K: usize = 5;

/// Knowledge passages retrieved as matching context.
pub const DEFAULT_KNOWLEDGE_TOP_K: usize = 3;

/// Character budget for assembled evidence context.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 8_000;

/// Per-call provider timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Attempts per provider call (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// First backoff delay; doubles after every failed attempt.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Ceiling for the backoff delay.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;

/// Units of work in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Knowledge records with a shorter body are skipped.
pub const DEFAULT_MIN_ARTIFACT_CHARS: usize = 20;

/// Knowledge record text is truncated to this many characters.
pub const DEFAULT_MAX_ARTIFACT_CHARS: usize = 2_000;

/// Separator placed between evidence items in assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n";

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use reqlens::constants::validate_embedding_dim;
///
/// assert!(validate_embedding_dim(1536, 1536).is_ok());
/// assert!(validate_embedding_dim(768, 1536).is_err());
/// assert!(validate_embedding_dim(0, 0).is_err());
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual == 0 {
        return Err(DimValidationError::ZeroDimension);
    }
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
