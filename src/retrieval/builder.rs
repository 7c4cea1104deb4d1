//! Index build phase: corpus + cache + provider into a [`VectorIndex`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::error::RetrievalError;
use crate::config::EngineConfig;
use crate::constants::DEFAULT_EMBEDDING_BATCH_SIZE;
use crate::corpus::KnowledgeCorpus;
use crate::embedding::{EmbeddingCache, EmbeddingError, EmbeddingProvider, check_batch};
use crate::index::VectorIndex;
use crate::retry::{RetryPolicy, call_with_retry};

/// What an index build did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Vectors taken from the cache file.
    pub reused: usize,
    /// Vectors requested from the provider.
    pub computed: usize,
    /// Cache entries dropped because another model produced them.
    pub stale: usize,
}

/// Builds a [`VectorIndex`] for a corpus, reusing cached vectors where the model matches.
///
/// Runs before any concurrent search: the returned index is never written again.
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
    batch_size: usize,
    cache_path: Option<PathBuf>,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self {
            embedder,
            policy,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            cache_path: None,
        }
    }

    pub fn from_config(config: &EngineConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            policy: config.retry_policy(),
            batch_size: config.embedding_batch_size,
            cache_path: config.cache_path.clone(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Embeds every corpus artifact (cache first) and builds the index in corpus order.
    ///
    /// Any provider failure fails the build; a batch is never half-applied.
    #[instrument(skip_all, fields(artifacts = corpus.len(), model = self.embedder.model_id()))]
    pub async fn build(
        &self,
        corpus: &KnowledgeCorpus,
    ) -> Result<(VectorIndex, BuildStats), RetrievalError> {
        let model_id = self.embedder.model_id().to_string();
        let mut stats = BuildStats::default();
        let mut cache = self.load_cache(&model_id, &mut stats);

        let mut seen = HashSet::new();
        let mut misses: Vec<String> = Vec::new();
        for artifact in corpus.iter() {
            if cache.get(artifact.text()).is_some() {
                stats.reused += 1;
            } else if seen.insert(artifact.text()) {
                misses.push(artifact.text().to_string());
            }
        }

        for chunk in misses.chunks(self.batch_size.max(1)) {
            let vectors = self.embed_batch(chunk).await?;
            for (text, vector) in chunk.iter().zip(vectors) {
                cache.insert(text, vector);
            }
            stats.computed += chunk.len();
        }

        let mut index = VectorIndex::new();
        let mut entries = Vec::with_capacity(corpus.len());
        for artifact in corpus.iter() {
            let vector = cache
                .get(artifact.text())
                .map(<[f32]>::to_vec)
                .ok_or_else(|| EmbeddingError::InvalidResponse {
                    reason: format!("no vector produced for artifact '{}'", artifact.id()),
                })?;
            entries.push((artifact.id().clone(), vector));
        }
        index.build(entries)?;

        self.save_cache(&cache);

        info!(
            reused = stats.reused,
            computed = stats.computed,
            stale = stats.stale,
            dim = ?index.dim(),
            "Vector index ready"
        );

        Ok((index, stats))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let vectors = call_with_retry(&self.policy, "embed_corpus", || {
            self.embedder.embed(texts)
        })
        .await?;
        check_batch(texts.len(), &vectors)?;
        Ok(vectors)
    }

    fn load_cache(&self, model_id: &str, stats: &mut BuildStats) -> EmbeddingCache {
        let Some(path) = &self.cache_path else {
            return EmbeddingCache::new(model_id);
        };

        match EmbeddingCache::load(path, model_id) {
            Ok((cache, load_stats)) => {
                stats.stale = load_stats.stale;
                cache
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable embedding cache");
                EmbeddingCache::new(model_id)
            }
        }
    }

    fn save_cache(&self, cache: &EmbeddingCache) {
        let Some(path) = &self.cache_path else {
            return;
        };
        if !cache.is_dirty() && path.exists() {
            return;
        }
        if let Err(e) = cache.save(path) {
            warn!(path = %path.display(), error = %e, "Failed to persist embedding cache");
        }
    }
}
