// Classifier error handling for lazily compiled line patterns
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ClassifierError {
    #[error("Regex compilation failed for pattern '{pattern}' (name: {name}): {source}")]
    CompilationFailed {
        pattern: String,
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Regex pattern not found: {name}")]
    PatternNotFound { name: String },
}

impl ClassifierError {
    /// Whether the remaining rules can still run after this error.
    ///
    /// A broken pattern table fails every rule built on it; a missing name
    /// only affects the rule that asked for it.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ClassifierError::CompilationFailed { .. })
    }
}
