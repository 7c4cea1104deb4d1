//! Pipelines: matching (issue x story), conflict (new criterion vs existing ones) and
//! conformance (criterion vs its story).
//!
//! Every unit of work runs on a bounded pool and always yields its records. Provider
//! failures degrade the unit to the pipeline's fallback label; they never abort a run.

mod conflict;
mod conformance;
pub mod error;
mod matching;
pub mod pool;


pub use conflict::{ConflictPipeline, ConflictReport, ConflictStatus};
pub use conformance::{ConformancePipeline, ConformanceReport};
pub use error::{PipelineError, PipelineResult};
pub use matching::{MatchingPipeline, MatchingReport};
pub use pool::{ResultSink, run_bounded};

use tracing::warn;

use crate::corpus::ArtifactId;
use crate::retrieval::RetrievalEngine;

/// Knowledge passages for one pair, or none when retrieval is off or fails.
async fn knowledge_evidence(
    knowledge: Option<&RetrievalEngine>,
    query: &str,
    top_k: usize,
    query_id: &ArtifactId,
    candidate_id: &ArtifactId,
) -> Vec<String> {
    let Some(retrieval) = knowledge else {
        return Vec::new();
    };

    match retrieval.retrieve_text(query, top_k).await {
        Ok(result) => retrieval
            .assemble_context(&result)
            .texts()
            .map(str::to_string)
            .collect(),
        Err(e) => {
            warn!(
                query = %query_id,
                candidate = %candidate_id,
                error = %e,
                "Knowledge retrieval failed, judging without context"
            );
            Vec::new()
        }
    }
}
