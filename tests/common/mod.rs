//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqlens::{Artifact, EngineConfig, KnowledgeCorpus, RetryPolicy, StubEmbedder};

/// Log output for failing runs, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = reqlens::init_tracing();
}

/// Defaults with millisecond backoff so failure paths stay fast.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        timeout: Duration::from_secs(5),
        max_attempts: 2,
        initial_backoff: Duration::from_millis(1),
        concurrency: 3,
        ..EngineConfig::default()
    }
}

pub fn fast_config_with_cache(path: PathBuf) -> EngineConfig {
    EngineConfig {
        cache_path: Some(path),
        ..fast_config()
    }
}

pub fn fast_policy() -> RetryPolicy {
    fast_config().retry_policy()
}

/// Three criteria on a line: a1 at 0, a2 at 1, a3 at 3.
pub fn scenario_a_corpus() -> KnowledgeCorpus {
    let (corpus, rejected) = KnowledgeCorpus::from_artifacts(vec![
        Artifact::criterion("a1", "Pay with credit card"),
        Artifact::criterion("a2", "Save cart for later"),
        Artifact::criterion("a3", "Track order status"),
    ]);
    assert!(rejected.is_empty());
    corpus
}

pub fn scenario_a_embedder() -> Arc<StubEmbedder> {
    Arc::new(
        StubEmbedder::new(2)
            .with_vector("Pay with credit card", vec![0.0, 0.0])
            .with_vector("Save cart for later", vec![1.0, 0.0])
            .with_vector("Track order status", vec![3.0, 0.0])
            .with_vector("Keep my cart", vec![1.0, 0.0]),
    )
}

pub fn issues() -> Vec<Artifact> {
    vec![
        Artifact::issue(
            "ISSUE-1",
            "Coupon rejected",
            "Valid coupon codes are refused at checkout",
        ),
        Artifact::issue(
            "ISSUE-2",
            "Wishlist lost",
            "Saved items disappear after logging out",
        ),
    ]
}

pub fn stories() -> Vec<Artifact> {
    vec![
        Artifact::user_story("US-1", "As a buyer I want to apply discount coupons at checkout"),
        Artifact::user_story("US-2", "As a shopper I want to keep a wishlist across sessions"),
    ]
}

/// Existing acceptance criteria for the conflict scenarios.
pub fn existing_criteria() -> KnowledgeCorpus {
    let (corpus, rejected) = KnowledgeCorpus::from_artifacts(vec![
        Artifact::criterion(
            "AC-1",
            "Given a paid order, when payment succeeds, then a receipt is emailed",
        ),
        Artifact::criterion(
            "AC-2",
            "Given a profile, when the photo is changed, then the avatar updates",
        ),
    ]);
    assert!(rejected.is_empty());
    corpus
}

pub const NEW_CRITERION: &str =
    "Given a paid order, when payment succeeds, then the customer receives a receipt by email";

/// Pins the conflict fixtures so AC-1 is nearest to the new criterion and AC-2 second.
pub fn conflict_embedder() -> StubEmbedder {
    StubEmbedder::new(2)
        .with_vector(NEW_CRITERION, vec![0.0, 0.0])
        .with_vector(
            "Given a paid order, when payment succeeds, then a receipt is emailed",
            vec![0.5, 0.0],
        )
        .with_vector(
            "Given a profile, when the photo is changed, then the avatar updates",
            vec![4.0, 0.0],
        )
}
