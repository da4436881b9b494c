use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use ort::session::Session;
use ort::value::Tensor;

use super::error::ClassifierError;
use super::features::FeatureVector;
use super::model::{argmax, Model, Prediction};
use crate::models::{ModelManifest, Vocabulary};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A bag-of-words classifier exported to ONNX.
///
/// The model is expected to:
/// - Accept one f32 input of shape [1, vocabulary_size], column i holding the
///   weighted count of `manifest.vocabulary[i]`
/// - Produce an f32 output holding one probability per label, shape [1, labels] or [labels]
#[derive(Debug)]
pub struct OnnxModel {
    manifest: ModelManifest,
    model_path: PathBuf,
    vocabulary: Vocabulary,
    session: Session,
    input_name: String,
    output_index: usize,
}

impl OnnxModel {
    /// Loads `manifest.model_file` from `dir` and checks it against the manifest.
    pub fn load(
        dir: impl AsRef<Path>,
        manifest: ModelManifest,
        config: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        manifest.validate()?;
        let model_path = dir.as_ref().join(&manifest.model_file);
        if !model_path.exists() {
            return Err(ClassifierError::ModelError(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = create_session_builder(config)?.commit_from_file(&model_path)?;
        let (input_name, output_index) = Self::validate_model(&session, &manifest)?;
        info!(
            "Loaded model '{}' from {:?} ({} features, {} labels)",
            manifest.name,
            model_path,
            manifest.vocabulary.len(),
            manifest.labels.len()
        );

        Ok(Self {
            vocabulary: Vocabulary::from_manifest(&manifest),
            manifest,
            model_path,
            session,
            input_name,
            output_index,
        })
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Resolves the input tensor name and output index named by the manifest.
    ///
    /// # Returns
    /// * `Result<(String, usize), ClassifierError>` - or an error if:
    ///   - The model has no inputs or no outputs
    ///   - The manifest names an input or output the model doesn't have
    fn validate_model(
        session: &Session,
        manifest: &ModelManifest,
    ) -> Result<(String, usize), ClassifierError> {
        let inputs = &session.inputs;
        if inputs.is_empty() {
            return Err(ClassifierError::ModelError("Model must have at least 1 input for features".into()));
        }
        let outputs = &session.outputs;
        if outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for probabilities".into(),
            ));
        }

        let input_name = match &manifest.input_name {
            Some(name) => inputs
                .iter()
                .find(|input| &input.name == name)
                .map(|input| input.name.clone())
                .ok_or_else(|| ClassifierError::ModelError(format!("Model has no input named '{}'", name)))?,
            None => inputs[0].name.clone(),
        };
        let output_index = match &manifest.output_name {
            Some(name) => outputs
                .iter()
                .position(|output| &output.name == name)
                .ok_or_else(|| ClassifierError::ModelError(format!("Model has no output named '{}'", name)))?,
            None => 0,
        };
        Ok((input_name, output_index))
    }
}

impl Model for OnnxModel {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        let (row, unknown) = self.vocabulary.vectorize(features);
        if unknown > 0 {
            debug!("{} of {} tokens are outside the model vocabulary", unknown, features.len());
        }

        let input_dyn = row.into_dyn();
        let input = input_dyn.as_standard_layout();
        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input)
                .map_err(|e| ClassifierError::InferenceError(format!("Failed to create input tensor: {}", e)))?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[self.output_index]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceError(format!("Failed to extract output tensor: {}", e)))?;

        let probabilities: Vec<f32> = output_tensor.iter().copied().collect();
        if probabilities.len() != self.manifest.labels.len() {
            return Err(ClassifierError::InferenceError(format!(
                "Model produced {} scores of shape {:?} for {} labels",
                probabilities.len(),
                output_tensor.shape(),
                self.manifest.labels.len()
            )));
        }

        let (best, probability) = argmax(&probabilities)
            .ok_or_else(|| ClassifierError::InferenceError("Model produced no finite scores".into()))?;
        Prediction::new(self.manifest.labels[best].clone(), f64::from(probability))
    }
}
