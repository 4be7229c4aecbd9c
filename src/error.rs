use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymbindError {
    #[error("Marshal error: {0}")]
    Marshal(String),

    #[error("Fit failed: {0}")]
    FitFailed(String),

    #[error("Malformed program at byte {position}: {message}")]
    MalformedProgram { position: usize, message: String },

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Estimator is not fitted, call fit before predict")]
    NotFitted,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Library error: {0}")]
    Library(String),

    #[error("Metric error: {0}")]
    Metric(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl SymbindError {
    pub(crate) fn malformed(position: usize, message: impl Into<String>) -> Self {
        SymbindError::MalformedProgram {
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SymbindError>;
