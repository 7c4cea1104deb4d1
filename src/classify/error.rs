use thiserror::Error;

/// Oracle answer outside the taxonomy. Always resolved locally to the fallback label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("oracle response is empty")]
    Empty,

    #[error("no taxonomy label in '{line}'")]
    NoLabel { line: String },

    #[error("no answer line for item {index}")]
    MissingLine { index: usize },
}
