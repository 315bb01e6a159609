//! Error types for the Kolosal pipeline builder

use thiserror::Error;

/// Result type alias for Kolosal operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for pipeline construction, configuration and execution
#[derive(Error, Debug)]
pub enum KolosalError {
    /// A configuration does not come from the space it is applied to
    #[error("Configuration passed does not come from the same configuration space. Differences are:\n{diff}")]
    ConfigurationMismatch { diff: String },

    /// include/exclude references an unknown step or component
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("No valid pipeline found: {0}")]
    NoValidPipeline(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported node kind: {0}")]
    UnsupportedNodeKind(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for KolosalError {
    fn from(err: ndarray::ShapeError) -> Self {
        KolosalError::ShapeError {
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
        let err = KolosalError::NoValidPipeline("sparse data".to_string());
        assert_eq!(err.to_string(), "No valid pipeline found: sparse data");
    }

    #[test]
    fn test_mismatch_carries_diff() {
        let err = KolosalError::ConfigurationMismatch {
            diff: "- a\n+ b".to_string(),
        };
        assert!(err.to_string().contains("- a\n+ b"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: KolosalError = json_err.into();
        assert!(matches!(err, KolosalError::SerializationError(_)));
    }
}
