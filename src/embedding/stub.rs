//! Deterministic in-process embedder for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::error::EmbeddingError;
use super::provider::EmbeddingProvider;
use crate::hashing::hash_to_u64;

/// Default dimension for stub vectors.
pub const STUB_EMBEDDING_DIM: usize = 64;

/// Feature-hashed bag-of-words embedder.
///
/// Texts sharing words land close together, so nearest-neighbour tests behave sensibly
/// without a model. Individual texts can be pinned to exact vectors, and failures can be
/// scripted.
#[derive(Debug)]
pub struct StubEmbedder {
    model_id: String,
    dim: usize,
    pinned: HashMap<String, Vec<f32>>,
    fail_on: Vec<String>,
    transient_failures: Mutex<usize>,
    calls: AtomicUsize,
    texts_embedded: AtomicUsize,
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(STUB_EMBEDDING_DIM)
    }
}

impl StubEmbedder {
    /// A `dim` of zero is raised to one.
    pub fn new(dim: usize) -> Self {
        Self {
            model_id: "stub-bow".to_string(),
            dim: dim.max(1),
            pinned: HashMap::new(),
            fail_on: Vec::new(),
            transient_failures: Mutex::new(0),
            calls: AtomicUsize::new(0),
            texts_embedded: AtomicUsize::new(0),
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Returns `vector` (verbatim) whenever `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.into(), vector);
        self
    }

    /// Fails any batch containing a text that includes `needle`.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on.push(needle.into());
        self
    }

    /// The next `n` calls fail with a transient transport error.
    pub fn with_transient_failures(self, n: usize) -> Self {
        *self.transient_failures.lock() = n;
        self
    }

    /// Number of `embed` calls seen, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of texts successfully embedded.
    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Vector the stub produces for `text`, bypassing scripting.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.pinned.get(text) {
            return v.clone();
        }

        let mut v = vec![0.0f32; self.dim];
        let mut any = false;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = hash_to_u64(token.to_lowercase().as_bytes());
            let bucket = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
            any = true;
        }

        if !any {
            // No words: seeded sequence so distinct texts still differ.
            let mut state = hash_to_u64(text.as_bytes());
            for x in &mut v {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                *x = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            }
        }

        normalize(v)
    }
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        {
            let mut remaining = self.transient_failures.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(EmbeddingError::Transport {
                    reason: "scripted transient failure".to_string(),
                });
            }
        }

        if let Some(text) = texts
            .iter()
            .find(|t| self.fail_on.iter().any(|needle| t.contains(needle.as_str())))
        {
            return Err(EmbeddingError::Status {
                status: 400,
                body: format!("scripted failure for '{}'", text),
            });
        }

        debug!(count = texts.len(), "Generating stub embeddings");
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}
