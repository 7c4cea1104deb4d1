//! Retrieval-augmented classification.
//!
//! A [`Template`] renders the task prompt with its taxonomy, the
//! [`ClassificationEngine`] asks the oracle and canonicalises the answer into a
//! [`Label`], producing an immutable [`ClassificationRecord`].

mod engine;
pub mod error;
pub mod parser;
pub mod prompt;
mod record;
pub mod taxonomy;

#[cfg(test)]
mod tests;

pub use engine::{BatchClassification, ClassificationEngine};
pub use error::ParseError;
pub use parser::{Verdict, normalize_line, parse_each, parse_label, parse_single};
pub use prompt::{CONFLICT, CONFORMANCE, MATCHING, Prompt, Template};
pub use record::{ClassificationRecord, RecordStatus};
pub use taxonomy::{ConformanceLabel, Label, MatchLabel, RelationLabel};
