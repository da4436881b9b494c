use std::fmt;

use super::error::ClassifierError;
use super::features::FeatureVector;

/// The result of one classification: the top label and the probability the
/// model reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub(crate) label: String,
    pub(crate) probability: f64,
}

impl Prediction {
    /// Creates a prediction, rejecting empty labels and probabilities outside `[0, 1]`.
    pub fn new(label: impl Into<String>, probability: f64) -> Result<Self, ClassifierError> {
        let label = label.into();
        if label.is_empty() {
            return Err(ClassifierError::InferenceError("Model returned an empty label".into()));
        }
        if !(0.0..=1.0).contains(&probability) {
            return Err(ClassifierError::InferenceError(format!(
                "Model returned probability {} for '{}', expected a value in [0, 1]",
                probability, label
            )));
        }
        Ok(Self { label, probability })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn into_parts(self) -> (String, f64) {
        (self.label, self.probability)
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Classification: {}", self.label)
    }
}

/// A trained model that maps a bag of words to a label.
///
/// The model owns the numeric transform: vocabulary order, weighting and
/// output interpretation all come from the artifact. Implementations must be
/// safe to call from several threads at once, since a single instance serves
/// every in-flight request until it is swapped out.
pub trait Model: Send + Sync + fmt::Debug {
    /// Identifies the model, typically the asset name it was loaded under.
    fn name(&self) -> &str;

    /// Version string of the artifact, if it carries one.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Runs inference on `features` and returns the top prediction.
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError>;
}

/// Index and value of the largest finite entry.
pub(crate) fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}
