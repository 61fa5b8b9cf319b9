//! Error types for the heartpredict pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for heartpredict operations
pub type Result<T> = std::result::Result<T, HeartPredictError>;

/// Main error type for the heartpredict pipeline
#[derive(Error, Debug)]
pub enum HeartPredictError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Dataset not found: {}", path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("Malformed dataset, missing columns: {}", missing.join(", "))]
    MalformedDataset { missing: Vec<String> },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Artifact file not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for HeartPredictError {
    fn from(err: polars::error::PolarsError) -> Self {
        HeartPredictError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for HeartPredictError {
    fn from(err: serde_json::Error) -> Self {
        HeartPredictError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HeartPredictError {
    fn from(err: ndarray::ShapeError) -> Self {
        HeartPredictError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HeartPredictError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_artifact_not_found_carries_path() {
        let err = HeartPredictError::ArtifactNotFound {
            path: PathBuf::from("results/trained_models/classifier/CoolModel.json"),
        };
        assert!(err.to_string().contains("CoolModel.json"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HeartPredictError = io_err.into();
        assert!(matches!(err, HeartPredictError::IoError(_)));
    }
}
