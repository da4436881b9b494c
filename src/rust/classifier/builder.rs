use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use super::classifier::{Classifier, EmptyInputPolicy};
use super::error::ClassifierError;
use super::features::{ExtractorConfig, FeatureExtractor};
use super::model::Model;
use crate::model_manager::ModelStore;

/// A builder for constructing a Classifier with a fluent interface.
///
/// A model is optional: a classifier built without one reports
/// `ModelUnavailable` until a model is installed.
#[derive(Default, Debug)]
pub struct ClassifierBuilder {
    extractor_config: ExtractorConfig,
    empty_input: EmptyInputPolicy,
    model: Option<Arc<dyn Model>>,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use wordbag::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tokenizer policy used for feature extraction
    ///
    /// # Example
    /// ```
    /// use wordbag::{ClassifierBuilder, ExtractorConfig, Segmenter};
    ///
    /// let builder = ClassifierBuilder::new().with_extractor_config(ExtractorConfig {
    ///     segmenter: Segmenter::Bert,
    ///     keep_other: true,
    ///     max_token_chars: None,
    /// });
    /// ```
    pub fn with_extractor_config(mut self, config: ExtractorConfig) -> Self {
        self.extractor_config = config;
        self
    }

    pub fn with_empty_input_policy(mut self, policy: EmptyInputPolicy) -> Self {
        self.empty_input = policy;
        self
    }

    /// Sets the initial model
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Loads the named model from `store` and sets it as the initial model
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - A model is already set
    ///   - The model is not in the store or fails verification
    ///   - The ONNX model failed to load or doesn't match its manifest
    pub fn with_stored_model(mut self, store: &ModelStore, name: &str) -> Result<Self, ClassifierError> {
        if self.model.is_some() {
            return Err(ClassifierError::ValidationError("Model already set".to_string()));
        }
        let model = store.load(name)?;
        info!("Model '{}' loaded from store", name);
        self.model = Some(Arc::new(model));
        Ok(self)
    }

    /// Builds and returns the final Classifier instance
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - or an error if:
    ///   - `max_token_chars` is set to zero
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        if self.extractor_config.max_token_chars == Some(0) {
            return Err(ClassifierError::ValidationError(
                "max_token_chars must be at least 1".to_string(),
            ));
        }
        Ok(Classifier {
            extractor: FeatureExtractor::new(self.extractor_config),
            empty_input: self.empty_input,
            model: RwLock::new(self.model),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_model() {
        let classifier = ClassifierBuilder::new().build().unwrap();
        assert!(!classifier.is_ready());
        let info = classifier.info();
        assert!(info.model_name.is_none());
        assert_eq!(info.empty_input, EmptyInputPolicy::Reject);
    }

    #[test]
    fn test_zero_token_length_rejected() {
        let result = ClassifierBuilder::new()
            .with_extractor_config(ExtractorConfig {
                max_token_chars: Some(0),
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_stored_model_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let result = ClassifierBuilder::new().with_stored_model(&store, "sentiment");
        assert!(matches!(result, Err(ClassifierError::ModelError(_))));
    }
}
