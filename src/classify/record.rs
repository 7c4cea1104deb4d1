use chrono::{DateTime, Utc};
use serde::Serialize;

use super::taxonomy::Label;
use crate::corpus::ArtifactId;

/// How a record's label was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordStatus {
    /// The oracle answered with a taxonomy label.
    Judged,
    /// The oracle answered outside the taxonomy; the label is the fallback.
    Unparsed,
    /// The oracle call failed after retries; the label is the fallback.
    Failed { error: String },
}

/// One immutable judgment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord<L> {
    query_id: ArtifactId,
    candidate_id: Option<ArtifactId>,
    label: L,
    rationale: String,
    status: RecordStatus,
    #[serde(rename = "timestamp")]
    created_at: DateTime<Utc>,
}

impl<L: Label> ClassificationRecord<L> {
    pub(crate) fn new(
        query_id: ArtifactId,
        candidate_id: Option<ArtifactId>,
        label: L,
        rationale: impl Into<String>,
        status: RecordStatus,
    ) -> Self {
        Self {
            query_id,
            candidate_id,
            label,
            rationale: rationale.into(),
            status,
            created_at: Utc::now(),
        }
    }

    /// Fallback record for a unit whose oracle call failed.
    pub(crate) fn failed(
        query_id: ArtifactId,
        candidate_id: Option<ArtifactId>,
        error: impl std::fmt::Display,
    ) -> Self {
        let error = error.to_string();
        Self::new(
            query_id,
            candidate_id,
            L::fallback(),
            format!("classification failed: {}", error),
            RecordStatus::Failed { error },
        )
    }

    pub fn query_id(&self) -> &ArtifactId {
        &self.query_id
    }

    pub fn candidate_id(&self) -> Option<&ArtifactId> {
        self.candidate_id.as_ref()
    }

    pub fn label(&self) -> L {
        self.label
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn status(&self) -> &RecordStatus {
        &self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RecordStatus::Failed { .. })
    }

    /// `true` if the label is the fallback because of a failure or an unparsable answer.
    pub fn is_degraded(&self) -> bool {
        !matches!(self.status, RecordStatus::Judged)
    }
}
