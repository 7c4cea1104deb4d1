//! Text embedding providers and the persistent vector cache.
//!
//! - [`EmbeddingProvider`] is the seam: [`OpenAiEmbedder`] talks HTTP, [`StubEmbedder`]
//!   is deterministic and offline (`mock` feature).
//! - [`EmbeddingCache`] persists vectors across runs, keyed by text content.

pub mod cache;
mod error;
pub mod openai;
mod provider;
#[cfg(any(test, feature = "mock"))]
pub mod stub;

#[cfg(test)]
mod tests;

pub use cache::{CACHE_FORMAT_VERSION, CacheError, CacheLoadStats, CachedEmbedding, EmbeddingCache};
pub use error::EmbeddingError;
pub use openai::OpenAiEmbedder;
pub use provider::EmbeddingProvider;
pub(crate) use provider::check_batch;
#[cfg(any(test, feature = "mock"))]
pub use stub::{STUB_EMBEDDING_DIM, StubEmbedder};
