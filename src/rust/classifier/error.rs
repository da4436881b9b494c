use ort::Error as OrtError;
use std::fmt;

use crate::model_manager::ModelError;

/// Represents the different types of errors that can occur while classifying text.
#[derive(Debug)]
pub enum ClassifierError {
    /// No model has been loaded yet; callers should show a "not ready" state
    ModelUnavailable,
    /// The model rejected the features or failed while running
    InferenceError(String),
    /// No tokens were extracted and the classifier is configured to reject empty input
    EmptyInput,
    /// Error occurred while loading or validating a model
    ModelError(String),
    /// Error occurred due to invalid configuration
    ValidationError(String),
}

impl ClassifierError {
    /// Whether the caller can keep going and retry later (e.g. once a model arrives).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable | Self::InferenceError(_) | Self::EmptyInput
        )
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelUnavailable => write!(f, "Model unavailable: no model has been loaded yet"),
            Self::InferenceError(msg) => write!(f, "Inference error: {}", msg),
            Self::EmptyInput => write!(f, "Empty input: no tokens could be extracted"),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}

impl From<ModelError> for ClassifierError {
    fn from(err: ModelError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}
