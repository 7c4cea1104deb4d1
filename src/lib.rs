//! Reqlens library crate: retrieval-augmented classification of software requirements.
//!
//! Artifacts (user stories, issues, acceptance criteria, knowledge passages) are embedded,
//! indexed for exact nearest-neighbour search, and the nearest ones are handed to a
//! judgment oracle as evidence. The oracle's free-text answer is canonicalised into a
//! closed label set.
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`EngineConfig`], [`ConfigError`] - Engine configuration
//! - [`Artifact`], [`ArtifactId`], [`KnowledgeCorpus`] - Corpus of texts with identity
//! - [`VectorIndex`], [`SearchHit`] - Brute-force squared-L2 index
//!
//! ## Providers
//! - [`EmbeddingProvider`], [`OpenAiEmbedder`] - Text embedding
//! - [`JudgmentOracle`], [`GenaiOracle`] - LLM judgment
//! - [`EmbeddingCache`] - Persistent embedding cache (rkyv + mmap)
//!
//! ## Retrieval & Classification
//! - [`RetrievalEngine`], [`IndexBuilder`], [`EvidenceContext`] - Evidence retrieval
//! - [`ClassificationEngine`], [`ClassificationRecord`] - Oracle calls and parsing
//! - [`MatchLabel`], [`RelationLabel`], [`ConformanceLabel`] - Taxonomies
//!
//! ## Pipelines
//! - [`MatchingPipeline`] - Issue x user story relevance
//! - [`ConflictPipeline`] - New acceptance criterion vs existing ones
//! - [`ConformancePipeline`] - Acceptance criterion vs its user story
//!
//! ## Test/Mock Support
//! [`StubEmbedder`] and [`ScriptedOracle`] are available behind
//! `#[cfg(any(test, feature = "mock"))]`.

pub mod classify;
pub mod config;
pub mod constants;
pub mod corpus;
pub mod embedding;
pub mod hashing;
pub mod index;
pub mod oracle;
pub mod pipeline;
pub mod retrieval;
pub mod retry;
pub mod telemetry;

pub use classify::{
    ClassificationEngine, ClassificationRecord, ConformanceLabel, Label, MatchLabel, ParseError,
    RecordStatus, RelationLabel, parse_each, parse_label, parse_single,
};
pub use config::{ConfigError, EngineConfig};
pub use constants::{DimValidationError, validate_embedding_dim};
pub use corpus::{
    Artifact, ArtifactId, ArtifactKind, CorpusError, CorpusPolicy, CorpusRecord, KnowledgeCorpus,
};
pub use embedding::{CacheError, EmbeddingCache, EmbeddingError, EmbeddingProvider, OpenAiEmbedder};
pub use hashing::{content_key, hash_model_text, hash_to_u64};
pub use index::{IndexError, SearchHit, VectorIndex};
pub use oracle::{GenaiOracle, JudgmentOracle, OracleError, OracleRequest};
pub use pipeline::{
    ConflictPipeline, ConflictReport, ConflictStatus, ConformancePipeline, ConformanceReport,
    MatchingPipeline, MatchingReport, PipelineError,
};
pub use retrieval::{
    BuildStats, EvidenceContext, IndexBuilder, RetrievalEngine, RetrievalError, RetrievalResult,
};
pub use retry::{RetryPolicy, RetryableError, call_with_retry};
pub use telemetry::init_tracing;

#[cfg(any(test, feature = "mock"))]
pub use embedding::StubEmbedder;
#[cfg(any(test, feature = "mock"))]
pub use oracle::ScriptedOracle;
