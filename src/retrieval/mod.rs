//! Nearest-neighbour retrieval over the knowledge corpus.
//!
//! [`IndexBuilder`] runs once to produce the [`VectorIndex`]; [`RetrievalEngine`] then
//! serves concurrent, read-only queries against it. Self-matches are excluded by exact
//! text equality, so a paraphrase of the query is still returned as evidence.

mod builder;
pub mod context;
pub mod error;


pub use builder::{BuildStats, IndexBuilder};
pub use context::{EvidenceContext, EvidenceItem};
pub use error::RetrievalError;

use std::sync::Arc;

use moka::sync::Cache;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::constants::DEFAULT_MAX_CONTEXT_CHARS;
use crate::corpus::{Artifact, ArtifactId, KnowledgeCorpus};
use crate::embedding::{EmbeddingProvider, check_batch};
use crate::hashing::hash_model_text;
use crate::index::{SearchHit, VectorIndex};
use crate::retry::{RetryPolicy, call_with_retry};

const QUERY_MEMO_CAPACITY: u64 = 10_000;

/// Ordered retrieval output: ascending distance, at most `top_k` hits, never the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    hits: Vec<SearchHit>,
}

impl RetrievalResult {
    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn ids(&self) -> impl Iterator<Item = &ArtifactId> {
        self.hits.iter().map(|h| &h.artifact_id)
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn into_hits(self) -> Vec<SearchHit> {
        self.hits
    }
}

/// Read-only retrieval over a built index. Cheap to share behind an `Arc`.
pub struct RetrievalEngine {
    corpus: Arc<KnowledgeCorpus>,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
    max_context_chars: usize,
    query_memo: Cache<u64, Arc<Vec<f32>>>,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("corpus_len", &self.corpus.len())
            .field("index_len", &self.index.len())
            .field("model", &self.embedder.model_id())
            .field("max_context_chars", &self.max_context_chars)
            .finish()
    }
}

impl RetrievalEngine {
    pub fn new(
        corpus: Arc<KnowledgeCorpus>,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            corpus,
            index,
            embedder,
            policy,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            query_memo: Cache::builder().max_capacity(QUERY_MEMO_CAPACITY).build(),
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        corpus: Arc<KnowledgeCorpus>,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self::new(corpus, index, embedder, config.retry_policy())
            .with_max_context_chars(config.max_context_chars)
    }

    /// Builds the index for `corpus` and wraps both in an engine.
    pub async fn build(
        config: &EngineConfig,
        corpus: KnowledgeCorpus,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<(Self, BuildStats), RetrievalError> {
        let (index, stats) = IndexBuilder::from_config(config, embedder.clone())
            .build(&corpus)
            .await?;
        let engine = Self::from_config(config, Arc::new(corpus), Arc::new(index), embedder);
        Ok((engine, stats))
    }

    pub fn with_max_context_chars(mut self, max_chars: usize) -> Self {
        self.max_context_chars = max_chars;
        self
    }

    pub fn corpus(&self) -> &KnowledgeCorpus {
        &self.corpus
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    /// Corpus artifacts nearest to `query`, excluding any whose text equals the query's.
    ///
    /// Reuses the indexed vector when `query` is itself a corpus member.
    pub async fn retrieve(
        &self,
        query: &Artifact,
        top_k: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let vector = match self.indexed_vector(query) {
            Some(v) => v,
            None => self.embed_query(query.text()).await?,
        };
        self.search_excluding(query.text(), &vector, top_k)
    }

    /// Same as [`retrieve`](Self::retrieve) for free text that is not an artifact.
    pub async fn retrieve_text(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let vector = self.embed_query(query).await?;
        self.search_excluding(query, &vector, top_k)
    }

    /// Packs retrieved texts into the configured character budget.
    pub fn assemble_context(&self, result: &RetrievalResult) -> EvidenceContext {
        EvidenceContext::assemble(result.hits(), &self.corpus, self.max_context_chars)
    }

    /// [`retrieve`](Self::retrieve) followed by [`assemble_context`](Self::assemble_context).
    #[instrument(skip_all, fields(query_id = %query.id(), top_k = top_k))]
    pub async fn evidence_for(
        &self,
        query: &Artifact,
        top_k: usize,
    ) -> Result<EvidenceContext, RetrievalError> {
        let result = self.retrieve(query, top_k).await?;
        Ok(self.assemble_context(&result))
    }

    fn indexed_vector(&self, query: &Artifact) -> Option<Arc<Vec<f32>>> {
        let member = self.corpus.get(query.id())?;
        if member.text() != query.text() {
            return None;
        }
        self.index.vector(query.id()).map(|v| Arc::new(v.to_vec()))
    }

    async fn embed_query(&self, text: &str) -> Result<Arc<Vec<f32>>, RetrievalError> {
        if text.trim().is_empty() {
            return Err(RetrievalError::BlankQuery);
        }

        let key = hash_model_text(self.embedder.model_id(), text);
        if let Some(hit) = self.query_memo.get(&key) {
            return Ok(hit);
        }

        let input = [text.to_string()];
        let vectors = call_with_retry(&self.policy, "embed_query", || {
            self.embedder.embed(&input)
        })
        .await?;
        check_batch(1, &vectors)?;

        let vector = Arc::new(vectors.into_iter().next().unwrap_or_default());
        self.query_memo.insert(key, vector.clone());
        Ok(vector)
    }

    fn search_excluding(
        &self,
        query_text: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        // One extra slot so dropping the self-match still leaves top_k.
        let raw = self.index.search(vector, top_k.saturating_add(1))?;
        let before = raw.len();

        let mut hits: Vec<SearchHit> = raw
            .into_iter()
            .filter(|hit| {
                self.corpus
                    .get(&hit.artifact_id)
                    .is_none_or(|a| a.text() != query_text)
            })
            .collect();
        let excluded = before - hits.len();
        hits.truncate(top_k);

        debug!(returned = hits.len(), excluded, "Retrieval complete");

        Ok(RetrievalResult { hits })
    }
}
