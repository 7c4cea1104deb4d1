use std::sync::Arc;

use tracing::{debug, warn};

use super::parser::{parse_each, parse_single};
use super::prompt::Prompt;
use super::record::{ClassificationRecord, RecordStatus};
use super::taxonomy::Label;
use crate::config::EngineConfig;
use crate::constants::DEFAULT_ORACLE_MAX_TOKENS;
use crate::corpus::ArtifactId;
use crate::oracle::{JudgmentOracle, OracleError, OracleRequest};
use crate::retry::{RetryPolicy, call_with_retry};

/// Result of one oracle call that labels several candidates at once.
#[derive(Debug, Clone)]
pub struct BatchClassification<L> {
    /// One record per candidate, in candidate order.
    pub records: Vec<ClassificationRecord<L>>,
    /// Raw oracle answer, or the error that replaced it.
    pub response: Result<String, OracleError>,
}

impl<L> BatchClassification<L> {
    pub fn is_failed(&self) -> bool {
        self.response.is_err()
    }
}

/// Turns prompts into labelled records through the oracle.
///
/// Never fails: provider errors and off-taxonomy answers become fallback-labelled records
/// whose rationale says what happened.
#[derive(Clone)]
pub struct ClassificationEngine {
    oracle: Arc<dyn JudgmentOracle>,
    policy: RetryPolicy,
    max_tokens: u32,
}

impl std::fmt::Debug for ClassificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationEngine")
            .field("oracle", &self.oracle.model_id())
            .field("policy", &self.policy)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ClassificationEngine {
    pub fn new(oracle: Arc<dyn JudgmentOracle>, policy: RetryPolicy) -> Self {
        Self {
            oracle,
            policy,
            max_tokens: DEFAULT_ORACLE_MAX_TOKENS,
        }
    }

    pub fn from_config(config: &EngineConfig, oracle: Arc<dyn JudgmentOracle>) -> Self {
        Self::new(oracle, config.retry_policy()).with_max_tokens(config.oracle_max_tokens)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// One temperature-zero oracle call under the retry policy.
    pub async fn ask(&self, prompt: &Prompt) -> Result<String, OracleError> {
        let mut request = OracleRequest::deterministic(prompt.user.clone())
            .with_max_tokens(self.max_tokens);
        if let Some(system) = &prompt.system {
            request = request.with_system(system.clone());
        }

        call_with_retry(&self.policy, "judge", || self.oracle.judge(&request)).await
    }

    /// Single-label judgment. The first answer line picks the label.
    pub async fn classify<L: Label>(
        &self,
        query_id: &ArtifactId,
        candidate_id: Option<&ArtifactId>,
        prompt: &Prompt,
    ) -> ClassificationRecord<L> {
        let candidate_id = candidate_id.cloned();

        let response = match self.ask(prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(query = %query_id, candidate = ?candidate_id, error = %e, "Oracle call failed, using fallback label");
                return ClassificationRecord::failed(query_id.clone(), candidate_id, e);
            }
        };

        let trimmed = response.trim();
        match parse_single::<L>(trimmed) {
            Ok(label) => {
                debug!(query = %query_id, candidate = ?candidate_id, %label, "Classified");
                ClassificationRecord::new(
                    query_id.clone(),
                    candidate_id,
                    label,
                    trimmed,
                    RecordStatus::Judged,
                )
            }
            Err(e) => {
                warn!(query = %query_id, candidate = ?candidate_id, error = %e, "Unparsable oracle answer");
                ClassificationRecord::new(
                    query_id.clone(),
                    candidate_id,
                    L::fallback(),
                    trimmed,
                    RecordStatus::Unparsed,
                )
            }
        }
    }

    /// One oracle call labelling every candidate, aligned by answer line order.
    ///
    /// Candidates without a usable line get the fallback label.
    pub async fn classify_each<L: Label>(
        &self,
        query_id: &ArtifactId,
        candidates: &[ArtifactId],
        prompt: &Prompt,
    ) -> BatchClassification<L> {
        let response = match self.ask(prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(query = %query_id, candidates = candidates.len(), error = %e, "Oracle call failed, every candidate gets the fallback");
                let records = candidates
                    .iter()
                    .map(|c| ClassificationRecord::failed(query_id.clone(), Some(c.clone()), &e))
                    .collect();
                return BatchClassification {
                    records,
                    response: Err(e),
                };
            }
        };

        let verdicts = parse_each::<L>(response.trim(), candidates.len());
        let answered = response.lines().filter(|l| !l.trim().is_empty()).count();
        if answered != candidates.len() {
            warn!(
                query = %query_id,
                expected = candidates.len(),
                answered,
                "Oracle answer count differs from candidate count"
            );
        }

        let records = candidates
            .iter()
            .zip(verdicts)
            .map(|(candidate, verdict)| match verdict {
                Ok(v) => ClassificationRecord::new(
                    query_id.clone(),
                    Some(candidate.clone()),
                    v.label,
                    v.reason,
                    RecordStatus::Judged,
                ),
                Err(e) => ClassificationRecord::new(
                    query_id.clone(),
                    Some(candidate.clone()),
                    L::fallback(),
                    format!("{} (oracle answered {} lines)", e, answered),
                    RecordStatus::Unparsed,
                ),
            })
            .collect();

        BatchClassification {
            records,
            response: Ok(response),
        }
    }
}
