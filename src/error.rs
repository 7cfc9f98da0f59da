use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassexError>;

/// Unified error type for the crate.
///
/// I/O and configuration errors are recoverable at the caller boundary.
/// The invariant variants indicate a table-consistency bug and are fatal:
/// the optimiser aborts rather than continue from corrupt counts.
#[derive(Debug, Error)]
pub enum ClassexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corpus contains no sentences")]
    EmptyCorpus,

    #[error("token {0:?} is not in the vocabulary")]
    UnknownToken(String),

    #[error("requested {requested} classes; at least 1 is required")]
    InvalidClassCount { requested: usize },

    #[error("no candidate class for word {word:?}; count tables are inconsistent")]
    NoCandidateClass { word: String },
}

impl ClassexError {
    /// Whether the error indicates corrupt internal state rather than bad
    /// input. Drives the CLI's exit-code split.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::NoCandidateClass { .. })
    }
}
