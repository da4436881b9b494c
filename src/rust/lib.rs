//! Bag-of-words text classification with a hot-swappable model.
//!
//! Text is lowercased, split on Unicode word boundaries and counted into a
//! [`FeatureVector`]; a [`Classifier`] hands that mapping to whatever
//! [`Model`] is currently installed and returns the top label with its
//! probability.
//!
//! # Basic Usage
//!
//! ```rust
//! use wordbag::extract_features;
//!
//! let features = extract_features("Good movie, GOOD plot!");
//! assert_eq!(features.get("good"), Some(2));
//! assert_eq!(features.get("movie"), Some(1));
//! assert!(!features.contains(","));
//! ```
//!
//! Loading a model from the local store:
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use wordbag::{Classifier, ModelStore};
//!
//! let store = ModelStore::new_default()?;
//! let classifier = Classifier::builder()
//!     .with_stored_model(&store, "sentiment")?
//!     .build()?;
//!
//! let prediction = classifier.predict("This is a great movie!")?;
//! println!("{} ({:.1}%)", prediction, prediction.probability() * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Model updates
//!
//! The classifier starts without a model if none is available yet and
//! reports [`ClassifierError::ModelUnavailable`] until one arrives. New models
//! are announced over a channel:
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use wordbag::{model_channel, Classifier, ModelStore};
//!
//! let classifier = Arc::new(Classifier::builder().build()?);
//! let store = Arc::new(ModelStore::new_default()?);
//! let (publisher, subscription) = model_channel(8);
//! subscription.spawn(Arc::clone(&classifier), store);
//!
//! // Later, from the delivery side:
//! publisher.available("sentiment").await?;
//! # Ok(())
//! # }
//! ```

pub mod classifier;
mod runtime;
pub mod model_manager;
pub mod models;
pub mod updates;

pub use classifier::{
    classify, extract_features, Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo,
    EmptyInputPolicy, ExtractorConfig, FeatureExtractor, FeatureVector, Model, OnnxModel,
    Prediction, SegmentKind, Segmenter,
};
pub use runtime::{create_session_builder, RuntimeConfig};
pub use model_manager::{ModelError, ModelLoader, ModelStore};
pub use models::{ModelManifest, Vocabulary, Weighting};
pub use updates::{model_channel, ModelEvent, ModelPublisher, ModelSubscription, UpdateError, UpdateStats};

pub fn init_logger() {
    env_logger::init();
}
