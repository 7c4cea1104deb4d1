use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::error::PipelineResult;
use super::pool::run_bounded;
use crate::classify::{
    CONFLICT, ClassificationEngine, ClassificationRecord, RecordStatus, RelationLabel,
};
use crate::config::EngineConfig;
use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_CONFLICT_TOP_K};
use crate::corpus::{Artifact, ArtifactId, KnowledgeCorpus};
use crate::embedding::EmbeddingProvider;
use crate::oracle::JudgmentOracle;
use crate::retrieval::{BuildStats, RetrievalEngine};

/// How far a conflict check got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictStatus {
    Completed,
    /// Retrieval or the oracle failed; every record carries `Unknown`.
    Degraded { reason: String },
    /// The criterion had no usable text.
    Skipped { reason: String },
}

/// Outcome of checking one new criterion against the existing ones.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    criterion_id: ArtifactId,
    records: Vec<ClassificationRecord<RelationLabel>>,
    rationale: String,
    status: ConflictStatus,
}

impl ConflictReport {
    pub fn criterion_id(&self) -> &ArtifactId {
        &self.criterion_id
    }

    /// One record per retrieved candidate, in retrieval order.
    pub fn records(&self) -> &[ClassificationRecord<RelationLabel>] {
        &self.records
    }

    /// Consolidated rationale: the oracle's full answer, or why there is none.
    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn status(&self) -> &ConflictStatus {
        &self.status
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ConflictStatus::Degraded { .. })
    }

    pub fn labels(&self) -> Vec<RelationLabel> {
        self.records.iter().map(|r| r.label()).collect()
    }

    /// Candidates carrying `label`.
    pub fn candidates_with(&self, label: RelationLabel) -> Vec<&ArtifactId> {
        self.records
            .iter()
            .filter(|r| r.label() == label)
            .filter_map(|r| r.candidate_id())
            .collect()
    }
}

/// Retrieves the criteria nearest to a new one and labels each against it in a single
/// oracle call.
#[derive(Debug, Clone)]
pub struct ConflictPipeline {
    retrieval: Arc<RetrievalEngine>,
    classifier: ClassificationEngine,
    top_k: usize,
    concurrency: usize,
}

impl ConflictPipeline {
    pub fn new(retrieval: Arc<RetrievalEngine>, classifier: ClassificationEngine) -> Self {
        Self {
            retrieval,
            classifier,
            top_k: DEFAULT_CONFLICT_TOP_K,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        retrieval: Arc<RetrievalEngine>,
        oracle: Arc<dyn JudgmentOracle>,
    ) -> Self {
        Self::new(retrieval, ClassificationEngine::from_config(config, oracle))
            .with_top_k(config.conflict_top_k)
            .with_concurrency(config.concurrency)
    }

    /// Validates `config`, indexes the existing criteria and wires the pipeline.
    pub async fn build(
        config: &EngineConfig,
        existing: KnowledgeCorpus,
        embedder: Arc<dyn EmbeddingProvider>,
        oracle: Arc<dyn JudgmentOracle>,
    ) -> PipelineResult<(Self, BuildStats)> {
        config.validate()?;
        let (retrieval, stats) = RetrievalEngine::build(config, existing, embedder).await?;
        info!(
            reused = stats.reused,
            computed = stats.computed,
            stale = stats.stale,
            "Criteria index ready"
        );
        Ok((Self::from_config(config, Arc::new(retrieval), oracle), stats))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }

    #[instrument(skip_all, fields(criterion_id = %criterion.id(), top_k = self.top_k))]
    pub async fn run(&self, criterion: &Artifact) -> ConflictReport {
        let criterion_id = criterion.id().clone();

        if criterion.is_blank() {
            warn!("Skipping criterion with blank text");
            let reason = "criterion text is blank".to_string();
            return ConflictReport {
                criterion_id,
                records: Vec::new(),
                rationale: reason.clone(),
                status: ConflictStatus::Skipped { reason },
            };
        }

        let context = match self.retrieval.evidence_for(criterion, self.top_k).await {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Retrieval failed, criterion left unclassified");
                let reason = format!("retrieval failed: {}", e);
                let record = ClassificationRecord::new(
                    criterion_id.clone(),
                    None,
                    RelationLabel::Unknown,
                    reason.clone(),
                    RecordStatus::Failed {
                        error: e.to_string(),
                    },
                );
                return ConflictReport {
                    criterion_id,
                    records: vec![record],
                    rationale: reason.clone(),
                    status: ConflictStatus::Degraded { reason },
                };
            }
        };

        if context.dropped() > 0 {
            debug!(
                kept = context.len(),
                dropped = context.dropped(),
                "Candidates dropped by context budget"
            );
        }

        if context.is_empty() {
            return ConflictReport {
                criterion_id,
                records: Vec::new(),
                rationale: "no existing criteria to compare".to_string(),
                status: ConflictStatus::Completed,
            };
        }

        let candidates: Vec<ArtifactId> = context.ids().cloned().collect();
        let evidence: Vec<&str> = context.texts().collect();
        let prompt =
            CONFLICT.render::<RelationLabel>(&[("New criterion", criterion.text())], &evidence);

        let batch = self
            .classifier
            .classify_each::<RelationLabel>(&criterion_id, &candidates, &prompt)
            .await;

        let (rationale, status) = match batch.response {
            Ok(response) => (response.trim().to_string(), ConflictStatus::Completed),
            Err(e) => {
                let reason = format!("classification failed: {}", e);
                (reason.clone(), ConflictStatus::Degraded { reason })
            }
        };

        ConflictReport {
            criterion_id,
            records: batch.records,
            rationale,
            status,
        }
    }

    /// [`run`](Self::run) for several criteria on the bounded pool, in input order.
    #[instrument(skip_all, fields(criteria = criteria.len()))]
    pub async fn run_batch(&self, criteria: &[Artifact]) -> Vec<ConflictReport> {
        let units: Vec<&Artifact> = criteria.iter().collect();
        let reports = run_bounded(units, self.concurrency, |criterion| self.run(criterion)).await;

        info!(
            reports = reports.len(),
            degraded = reports.iter().filter(|r| r.is_degraded()).count(),
            "Conflict batch complete"
        );
        reports
    }
}
