use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::knowledge_evidence;
use super::pool::run_bounded;
use crate::classify::{CONFORMANCE, ClassificationEngine, ClassificationRecord, ConformanceLabel};
use crate::config::EngineConfig;
use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_KNOWLEDGE_TOP_K};
use crate::corpus::{Artifact, ArtifactId};
use crate::oracle::JudgmentOracle;
use crate::retrieval::RetrievalEngine;

/// Checks whether acceptance criteria agree with the user story they were written for.
#[derive(Debug, Clone)]
pub struct ConformancePipeline {
    classifier: ClassificationEngine,
    knowledge: Option<Arc<RetrievalEngine>>,
    knowledge_top_k: usize,
    concurrency: usize,
}

impl ConformancePipeline {
    pub fn new(classifier: ClassificationEngine) -> Self {
        Self {
            classifier,
            knowledge: None,
            knowledge_top_k: DEFAULT_KNOWLEDGE_TOP_K,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn from_config(config: &EngineConfig, oracle: Arc<dyn JudgmentOracle>) -> Self {
        Self::new(ClassificationEngine::from_config(config, oracle))
            .with_knowledge_top_k(config.knowledge_top_k)
            .with_concurrency(config.concurrency)
    }

    pub fn with_knowledge(mut self, retrieval: Arc<RetrievalEngine>) -> Self {
        self.knowledge = Some(retrieval);
        self
    }

    pub fn with_knowledge_top_k(mut self, top_k: usize) -> Self {
        self.knowledge_top_k = top_k;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// One record per `(criterion, story)` pair, in input order. Pairs with a blank side
    /// are skipped; failed or unparsable pairs get `Unknown`.
    #[instrument(skip_all, fields(pairs = pairs.len()))]
    pub async fn run(&self, pairs: &[(Artifact, Artifact)]) -> ConformanceReport {
        let units: Vec<(&Artifact, &Artifact)> = pairs
            .iter()
            .filter(|(criterion, story)| {
                let blank = criterion.is_blank() || story.is_blank();
                if blank {
                    warn!(criterion = %criterion.id(), story = %story.id(), "Skipping pair with blank text");
                }
                !blank
            })
            .map(|(criterion, story)| (criterion, story))
            .collect();

        let records = run_bounded(units, self.concurrency, |(criterion, story)| {
            self.judge_pair(criterion, story)
        })
        .await;

        let report = ConformanceReport { records };
        info!(
            pairs = report.len(),
            violations = report.count(ConformanceLabel::Violates),
            failed = report.failed_count(),
            "Conformance run complete"
        );
        report
    }

    async fn judge_pair(
        &self,
        criterion: &Artifact,
        story: &Artifact,
    ) -> ClassificationRecord<ConformanceLabel> {
        let query = format!("{} {}", criterion.text(), story.text());
        let evidence = knowledge_evidence(
            self.knowledge.as_deref(),
            &query,
            self.knowledge_top_k,
            criterion.id(),
            story.id(),
        )
        .await;
        let evidence: Vec<&str> = evidence.iter().map(String::as_str).collect();

        let prompt = CONFORMANCE.render::<ConformanceLabel>(
            &[
                ("User story", story.text()),
                ("Acceptance criterion", criterion.text()),
            ],
            &evidence,
        );
        self.classifier
            .classify(criterion.id(), Some(story.id()), &prompt)
            .await
    }
}

/// Records of one conformance run, keyed by `(criterion_id, story_id)`.
#[derive(Debug, Clone, Serialize)]
pub struct ConformanceReport {
    records: Vec<ClassificationRecord<ConformanceLabel>>,
}

impl ConformanceReport {
    pub fn records(&self) -> &[ClassificationRecord<ConformanceLabel>] {
        &self.records
    }

    pub fn get(
        &self,
        criterion_id: &ArtifactId,
        story_id: &ArtifactId,
    ) -> Option<&ClassificationRecord<ConformanceLabel>> {
        self.records
            .iter()
            .find(|r| r.query_id() == criterion_id && r.candidate_id() == Some(story_id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, label: ConformanceLabel) -> usize {
        self.records.iter().filter(|r| r.label() == label).count()
    }

    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failed()).count()
    }
}
