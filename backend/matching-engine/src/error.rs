use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchingError>;

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("Insufficient data: need at least {required} records, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(String),
}

impl MatchingError {
    /// Whether the caller is expected to see this error, as opposed to it
    /// being absorbed into a fallback path.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MatchingError::InvalidInput(_) | MatchingError::Config(_) | MatchingError::Corpus(_)
        )
    }
}

impl From<validator::ValidationErrors> for MatchingError {
    fn from(err: validator::ValidationErrors) -> Self {
        MatchingError::InvalidInput(err.to_string())
    }
}

impl From<envy::Error> for MatchingError {
    fn from(err: envy::Error) -> Self {
        MatchingError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MatchingError {
    fn from(err: serde_json::Error) -> Self {
        MatchingError::Corpus(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MatchingError {
    fn from(err: ndarray::ShapeError) -> Self {
        MatchingError::InvalidInput(format!("feature matrix shape: {}", err))
    }
}
