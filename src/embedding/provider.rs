use async_trait::async_trait;

use super::error::EmbeddingError;

/// Maps texts to fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input text, in input order, all
/// of the same dimension; otherwise the whole call fails. Identical `(model_id, text)`
/// pairs should yield identical vectors so cached vectors stay valid.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the underlying model. Tags every cached vector.
    fn model_id(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Checks the one-vector-per-text, single-dimension contract.
pub(crate) fn check_batch(expected: usize, vectors: &[Vec<f32>]) -> Result<(), EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }

    if let Some(first) = vectors.first() {
        if first.is_empty() {
            return Err(EmbeddingError::InvalidResponse {
                reason: "zero-dimension vector".to_string(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
            return Err(EmbeddingError::InvalidResponse {
                reason: format!(
                    "mixed dimensions in one batch: {} and {}",
                    first.len(),
                    bad.len()
                ),
            });
        }
    }

    Ok(())
}
