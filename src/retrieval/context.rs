//! Evidence context assembly under a character budget.

use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::CONTEXT_SEPARATOR;
use crate::corpus::{ArtifactId, KnowledgeCorpus};
use crate::index::SearchHit;

/// One retrieved artifact admitted into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceItem {
    pub artifact_id: ArtifactId,
    pub text: String,
    pub distance: f32,
}

/// Retrieved texts in ascending-distance order, each included whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvidenceContext {
    items: Vec<EvidenceItem>,
    /// Hits left out because the budget ran out.
    dropped: usize,
}

impl EvidenceContext {
    /// Packs `hits` into at most `max_chars` chars, separator included.
    ///
    /// The first hit that does not fit ends assembly: it and every later hit are
    /// dropped, never cut mid-text. Hits missing from `corpus` are skipped.
    pub fn assemble(hits: &[SearchHit], corpus: &KnowledgeCorpus, max_chars: usize) -> Self {
        let separator_len = CONTEXT_SEPARATOR.chars().count();
        let mut items = Vec::new();
        let mut used = 0usize;

        for (pos, hit) in hits.iter().enumerate() {
            let Some(artifact) = corpus.get(&hit.artifact_id) else {
                warn!(id = %hit.artifact_id, "Index hit missing from corpus, skipping");
                continue;
            };

            let cost = artifact.char_len() + if items.is_empty() { 0 } else { separator_len };
            if used + cost > max_chars {
                let dropped = hits.len() - pos;
                debug!(
                    kept = items.len(),
                    dropped,
                    budget = max_chars,
                    "Evidence context budget reached"
                );
                return Self { items, dropped };
            }

            used += cost;
            items.push(EvidenceItem {
                artifact_id: hit.artifact_id.clone(),
                text: artifact.text().to_string(),
                distance: hit.distance,
            });
        }

        Self { items, dropped: 0 }
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.text.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &ArtifactId> {
        self.items.iter().map(|i| &i.artifact_id)
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Texts joined by the context separator.
    pub fn render(&self) -> String {
        self.texts().collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
    }

    /// Length of [`render`](Self::render) in chars.
    pub fn char_len(&self) -> usize {
        self.render().chars().count()
    }
}
