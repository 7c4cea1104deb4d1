//! Knowledge corpus: the ordered, owning collection of artifacts.
//!
//! The corpus is the source of truth. A [`VectorIndex`](crate::index::VectorIndex) built
//! from it is a disposable projection that can always be rebuilt.

pub mod error;
pub mod types;


pub use error::{CorpusError, CorpusResult};
pub use types::{
    Artifact, ArtifactId, ArtifactKind, CorpusPolicy, CorpusRecord, truncate_chars,
};

use std::collections::HashMap;

use tracing::{debug, warn};

/// Ordered collection of artifacts keyed by id.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeCorpus {
    artifacts: Vec<Artifact>,
    positions: HashMap<ArtifactId, usize>,
}

impl KnowledgeCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a corpus from artifacts, skipping (and logging) the ones that fail admission.
    ///
    /// Returns the corpus plus the rejected artifacts' errors.
    pub fn from_artifacts<I>(artifacts: I) -> (Self, Vec<CorpusError>)
    where
        I: IntoIterator<Item = Artifact>,
    {
        let mut corpus = Self::new();
        let mut rejected = Vec::new();

        for artifact in artifacts {
            if let Err(e) = corpus.push(artifact) {
                warn!(error = %e, "Skipping artifact");
                rejected.push(e);
            }
        }

        (corpus, rejected)
    }

    /// Converts acquisition records into knowledge artifacts under `policy`.
    ///
    /// Text is `"{title} {text}"`, truncated to `policy.max_chars`. Records whose body is
    /// shorter than `policy.min_chars` are skipped.
    pub fn from_records<I>(records: I, policy: &CorpusPolicy) -> (Self, Vec<CorpusError>)
    where
        I: IntoIterator<Item = CorpusRecord>,
    {
        let mut corpus = Self::new();
        let mut rejected = Vec::new();

        for record in records {
            match Self::admit_record(record, policy).and_then(|a| corpus.push(a)) {
                Ok(()) => {}
                Err(e) => {
                    warn!(error = %e, "Skipping corpus record");
                    rejected.push(e);
                }
            }
        }

        debug!(
            admitted = corpus.len(),
            rejected = rejected.len(),
            "Corpus built from records"
        );

        (corpus, rejected)
    }

    fn admit_record(record: CorpusRecord, policy: &CorpusPolicy) -> CorpusResult<Artifact> {
        let id = ArtifactId::new(record.id);
        let body = record.text.trim();
        let body_len = body.chars().count();

        if body_len < policy.min_chars {
            return Err(CorpusError::TooShort {
                id,
                len: body_len,
                min: policy.min_chars,
            });
        }

        let title = record.title.trim();
        let joined = if title.is_empty() {
            body.to_string()
        } else {
            format!("{} {}", title, body)
        };
        let text = truncate_chars(&joined, policy.max_chars);

        let mut artifact = Artifact::knowledge(id, text).with_metadata("title", title);
        let category = record.category.trim();
        if !category.is_empty() {
            artifact = artifact.with_metadata("category", category);
        }
        Ok(artifact)
    }

    /// Appends an artifact. Blank text and duplicate ids are rejected.
    pub fn push(&mut self, artifact: Artifact) -> CorpusResult<()> {
        if artifact.is_blank() {
            return Err(CorpusError::BlankText {
                id: artifact.id().clone(),
            });
        }
        if self.positions.contains_key(artifact.id()) {
            return Err(CorpusError::DuplicateId {
                id: artifact.id().clone(),
            });
        }

        self.positions
            .insert(artifact.id().clone(), self.artifacts.len());
        self.artifacts.push(artifact);
        Ok(())
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.positions.get(id).map(|&pos| &self.artifacts[pos])
    }

    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.positions.contains_key(id)
    }

    /// Artifacts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Drops blank artifacts (with a warning) before they reach retrieval or classification.
pub fn admit_all(artifacts: &[Artifact]) -> Vec<&Artifact> {
    artifacts
        .iter()
        .filter(|a| {
            if a.is_blank() {
                warn!(id = %a.id(), kind = %a.kind(), "Skipping artifact with blank text");
                false
            } else {
                true
            }
        })
        .collect()
}
