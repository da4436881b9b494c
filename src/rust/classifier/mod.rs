mod error;
mod features;
mod model;
mod onnx;
#[allow(clippy::module_inception)]
mod classifier;
pub mod builder;

pub use error::ClassifierError;
pub use features::{
    extract_features, ExtractorConfig, FeatureExtractor, FeatureVector, SegmentKind, Segmenter,
};
pub use model::{Model, Prediction};
pub use onnx::OnnxModel;
pub use classifier::{classify, Classifier, EmptyInputPolicy};
pub use builder::ClassifierBuilder;

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Name of the installed model, if any
    pub model_name: Option<String>,
    /// Version of the installed model, if it declares one
    pub model_version: Option<String>,
    /// Whether requests can currently be classified
    pub ready: bool,
    /// Tokenizer policy
    pub extractor: ExtractorConfig,
    pub empty_input: EmptyInputPolicy,
}
