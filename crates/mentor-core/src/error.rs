//! Error types for the predictive core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient history: need at least {required} observations, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model not trained: call train before predict")]
    ModelNotTrained,

    #[error("Model busy: training in progress, try again later")]
    ModelBusy,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller can fix the condition by retrying with corrected
    /// input or after a delay
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientHistory { .. }
                | Error::DimensionMismatch { .. }
                | Error::ModelUnavailable(_)
                | Error::ModelNotTrained
                | Error::ModelBusy
                | Error::InvalidInput(_)
        )
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InsufficientHistory { .. } => "insufficient_history",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::ModelUnavailable(_) => "model_unavailable",
            Error::ModelNotTrained => "model_not_trained",
            Error::ModelBusy => "model_busy",
            Error::InvalidInput(_) => "invalid_input",
            Error::Config(_) => "config",
            Error::Csv(_) => "csv",
            Error::Io(_) => "io",
            Error::Http(_) => "http",
            Error::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_is_recoverable() {
        assert!(Error::InsufficientHistory {
            required: 3,
            actual: 2
        }
        .is_recoverable());
        assert!(Error::DimensionMismatch {
            expected: 3,
            actual: 4
        }
        .is_recoverable());
        assert!(Error::ModelUnavailable("down".into()).is_recoverable());
        assert!(Error::ModelNotTrained.is_recoverable());
        assert!(Error::ModelBusy.is_recoverable());
        assert!(!Error::Config("bad".into()).is_recoverable());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = Error::InsufficientHistory {
            required: 31,
            actual: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("31"));
        assert!(msg.contains("12"));
        assert_eq!(err.kind(), "insufficient_history");
    }
}
