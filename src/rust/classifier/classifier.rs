use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;

use super::error::ClassifierError;
use super::features::{FeatureExtractor, FeatureVector};
use super::model::{Model, Prediction};

/// What [`Classifier::predict`] does when the input yields no tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyInputPolicy {
    /// Fail with [`ClassifierError::EmptyInput`] without consulting the model
    #[default]
    Reject,
    /// Forward the empty mapping to the model like any other input
    Classify,
}

/// Runs `features` through `model` and checks the result.
///
/// This is the stateless core of the adapter: the features are handed over
/// verbatim and the model's reported probability is returned as-is.
pub fn classify(features: &FeatureVector, model: &dyn Model) -> Result<Prediction, ClassifierError> {
    let prediction = model.predict(features)?;
    // Models are external code; re-check what they hand back.
    Prediction::new(prediction.label().to_string(), prediction.probability())
}

/// A thread-safe text classifier holding a swappable model.
///
/// The model lives in a single-writer, multi-reader slot. Each request takes
/// its own reference to the current model before running inference, so a
/// swap affects only requests that start after it and never waits on one in
/// flight.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use wordbag::{Classifier, ClassifierError};
///
/// let classifier = Classifier::builder().build()?;
/// assert!(!classifier.is_ready());
/// assert!(matches!(
///     classifier.predict("Is this spam?"),
///     Err(ClassifierError::ModelUnavailable)
/// ));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Classifier {
    pub(super) extractor: FeatureExtractor,
    pub(super) empty_input: EmptyInputPolicy,
    pub(super) model: RwLock<Option<Arc<dyn Model>>>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        let model = self.current_model();
        super::ClassifierInfo {
            model_name: model.as_ref().map(|m| m.name().to_string()),
            model_version: model.as_ref().and_then(|m| m.version().map(str::to_string)),
            ready: model.is_some(),
            extractor: self.extractor.config().clone(),
            empty_input: self.empty_input,
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Whether a model is loaded.
    pub fn is_ready(&self) -> bool {
        self.model.read().is_some()
    }

    /// The model subsequent requests will use, if any.
    pub fn current_model(&self) -> Option<Arc<dyn Model>> {
        self.model.read().clone()
    }

    /// Installs `model` for all requests that start from now on and returns
    /// the model it replaced.
    pub fn update_model(&self, model: Arc<dyn Model>) -> Option<Arc<dyn Model>> {
        info!("Installing model '{}' ({})", model.name(), model.version().unwrap_or("unversioned"));
        self.model.write().replace(model)
    }

    /// Removes the current model; requests fail with `ModelUnavailable` until
    /// another one is installed.
    pub fn clear_model(&self) -> Option<Arc<dyn Model>> {
        let previous = self.model.write().take();
        if let Some(model) = &previous {
            info!("Withdrew model '{}'", model.name());
        }
        previous
    }

    /// Classifies an already-extracted feature mapping with the current model.
    pub fn classify(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        // Clone out of the slot so the lock is not held during inference.
        let model = self.current_model().ok_or(ClassifierError::ModelUnavailable)?;
        debug!("Classifying {} distinct tokens with model '{}'", features.len(), model.name());
        classify(features, model.as_ref())
    }

    /// Extracts features from `text` and classifies them.
    ///
    /// # Example
    /// ```rust
    /// # use std::sync::Arc;
    /// # use wordbag::{Classifier, ClassifierError, FeatureVector, Model, Prediction};
    /// # #[derive(Debug)]
    /// # struct Fixed;
    /// # impl Model for Fixed {
    /// #     fn name(&self) -> &str { "fixed" }
    /// #     fn predict(&self, _: &FeatureVector) -> Result<Prediction, ClassifierError> {
    /// #         Prediction::new("positive", 0.8)
    /// #     }
    /// # }
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let classifier = Classifier::builder().with_model(Arc::new(Fixed)).build()?;
    /// let prediction = classifier.predict("What a great movie!")?;
    /// println!("{}", prediction);
    /// assert_eq!(prediction.label(), "positive");
    /// # Ok(())
    /// # }
    /// ```
    pub fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let features = self.extractor.extract(text);
        if features.is_empty() && self.empty_input == EmptyInputPolicy::Reject {
            return Err(ClassifierError::EmptyInput);
        }
        self.classify(&features)
    }
}
