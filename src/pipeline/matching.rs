use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use super::knowledge_evidence;
use super::pool::run_bounded;
use crate::classify::{ClassificationEngine, ClassificationRecord, MATCHING, MatchLabel};
use crate::config::EngineConfig;
use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_KNOWLEDGE_TOP_K};
use crate::corpus::{Artifact, ArtifactId, admit_all};
use crate::oracle::JudgmentOracle;
use crate::retrieval::RetrievalEngine;

/// Judges every issue x user story pair.
///
/// Evidence is optional shared context from a knowledge base, never a filter: all pairs
/// are judged.
#[derive(Debug, Clone)]
pub struct MatchingPipeline {
    classifier: ClassificationEngine,
    knowledge: Option<Arc<RetrievalEngine>>,
    knowledge_top_k: usize,
    concurrency: usize,
}

impl MatchingPipeline {
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

    /// Adds the passages nearest to `"{issue} {story}"` to every prompt.
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

    /// One record per `(issue, story)` pair in issue-major order. Blank artifacts are
    /// skipped; failed pairs get `NoMatch`.
    #[instrument(skip_all, fields(issues = issues.len(), stories = stories.len()))]
    pub async fn run(&self, issues: &[Artifact], stories: &[Artifact]) -> MatchingReport {
        let issues = admit_all(issues);
        let stories = admit_all(stories);

        let pairs: Vec<(&Artifact, &Artifact)> = issues
            .iter()
            .flat_map(|issue| stories.iter().map(move |story| (*issue, *story)))
            .collect();

        let records = run_bounded(pairs, self.concurrency, |(issue, story)| {
            self.judge_pair(issue, story)
        })
        .await;

        let report = MatchingReport { records };
        info!(
            pairs = report.len(),
            matches = report.match_count(),
            failed = report.failed_count(),
            "Matching run complete"
        );
        report
    }

    async fn judge_pair(
        &self,
        issue: &Artifact,
        story: &Artifact,
    ) -> ClassificationRecord<MatchLabel> {
        let query = format!("{} {}", issue.text(), story.text());
        let evidence = knowledge_evidence(
            self.knowledge.as_deref(),
            &query,
            self.knowledge_top_k,
            issue.id(),
            story.id(),
        )
        .await;
        let evidence: Vec<&str> = evidence.iter().map(String::as_str).collect();

        let prompt = MATCHING.render::<MatchLabel>(
            &[("Issue", issue.text()), ("User story", story.text())],
            &evidence,
        );
        self.classifier
            .classify(issue.id(), Some(story.id()), &prompt)
            .await
    }
}

/// Records of one matching run, keyed by `(issue_id, story_id)`.
#[derive(Debug, Clone, Serialize)]
pub struct MatchingReport {
    records: Vec<ClassificationRecord<MatchLabel>>,
}

impl MatchingReport {
    pub fn records(&self) -> &[ClassificationRecord<MatchLabel>] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ClassificationRecord<MatchLabel>> {
        self.records
    }

    pub fn get(
        &self,
        issue_id: &ArtifactId,
        story_id: &ArtifactId,
    ) -> Option<&ClassificationRecord<MatchLabel>> {
        self.records
            .iter()
            .find(|r| r.query_id() == issue_id && r.candidate_id() == Some(story_id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.label() == MatchLabel::Match)
            .count()
    }

    /// Share of pairs labelled `Match`; `0.0` for an empty run.
    pub fn match_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.match_count() as f64 / self.records.len() as f64
    }

    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failed()).count()
    }

    /// Issues judged relevant to `story_id`, in run order.
    pub fn matches_for_story(&self, story_id: &ArtifactId) -> Vec<&ArtifactId> {
        self.records
            .iter()
            .filter(|r| r.candidate_id() == Some(story_id) && r.label() == MatchLabel::Match)
            .map(|r| r.query_id())
            .collect()
    }
}
