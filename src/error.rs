use thiserror::Error;

#[derive(Error, Debug)]
pub enum TickwatchError {
    #[error("Failed to load configuration: {0}")]
    Config(String),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] crate::classifier::ClassifierError),

    #[error("Failed to bind to address {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Errors raised while constructing the history store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History capacity must be at least 1")]
    ZeroCapacity,
}
