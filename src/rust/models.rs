use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Component, Path};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::classifier::FeatureVector;
use crate::model_manager::ModelError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DEFAULT_MODEL_FILE: &str = "model.onnx";

/// How token counts become input values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Raw occurrence counts
    #[default]
    Counts,
    /// 1.0 if the token occurs at all
    Binary,
    /// Count divided by the total number of tokens in the input
    Frequency,
}

/// Metadata stored next to a model file describing how to feed it and read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Asset name the model is published under
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Output labels, in the order of the model's probability columns
    pub labels: Vec<String>,
    /// Input tokens, in the order of the model's feature columns
    pub vocabulary: Vec<String>,
    #[serde(default)]
    pub weighting: Weighting,
    /// Name of the feature input tensor; the first input when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_name: Option<String>,
    /// Name of the probability output tensor; the first output when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    /// Hex-encoded SHA-256 of the model file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_hash: Option<String>,
}

fn default_model_file() -> String {
    DEFAULT_MODEL_FILE.to_string()
}

impl ModelManifest {
    pub fn new(
        name: impl Into<String>,
        labels: Vec<impl Into<String>>,
        vocabulary: Vec<impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            version: None,
            labels: labels.into_iter().map(Into::into).collect(),
            vocabulary: vocabulary.into_iter().map(Into::into).collect(),
            weighting: Weighting::default(),
            input_name: None,
            output_name: None,
            model_file: default_model_file(),
            model_hash: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_model_hash(mut self, hash: impl Into<String>) -> Self {
        self.model_hash = Some(hash.into());
        self
    }

    /// Checks the manifest for the following rules:
    /// - Name must be a single normal path component
    /// - At least one label, none empty, no duplicates
    /// - At least one vocabulary entry, none empty, no duplicates
    /// - Model file must be a single normal path component
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |msg: String| ModelError::InvalidManifest(msg);

        if !is_plain_file_name(&self.name) {
            return Err(invalid(format!("Model name '{}' is not a valid directory name", self.name)));
        }
        if self.labels.is_empty() {
            return Err(invalid(format!("Model '{}' must declare at least one label", self.name)));
        }
        if let Some(dup) = first_duplicate(&self.labels) {
            return Err(invalid(format!("Duplicate label '{}'", dup)));
        }
        if self.labels.iter().any(String::is_empty) {
            return Err(invalid("Labels cannot be empty".into()));
        }
        if self.vocabulary.is_empty() {
            return Err(invalid(format!("Model '{}' must declare a vocabulary", self.name)));
        }
        if let Some(pos) = self.vocabulary.iter().position(String::is_empty) {
            return Err(invalid(format!("Vocabulary entry {} cannot be empty", pos + 1)));
        }
        if let Some(dup) = first_duplicate(&self.vocabulary) {
            return Err(invalid(format!("Duplicate vocabulary entry '{}'", dup)));
        }
        if !is_plain_file_name(&self.model_file) {
            return Err(invalid(format!("Model file '{}' is not a valid file name", self.model_file)));
        }
        Ok(())
    }
}

/// True when `name` is exactly one `Component::Normal`, so joining it onto a
/// directory stays inside that directory.
pub(crate) fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let components: Vec<_> = Path::new(name).components().collect();
    matches!(components.as_slice(), [Component::Normal(c)] if *c == OsStr::new(name))
}

fn first_duplicate(items: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    items.iter().find(|item| !seen.insert(item.as_str())).map(String::as_str)
}

/// Maps tokens to feature columns and turns a [`FeatureVector`] into a dense row.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    weighting: Weighting,
}

impl Vocabulary {
    pub fn new(terms: &[String], weighting: Weighting) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        Self { index, weighting }
    }

    pub fn from_manifest(manifest: &ModelManifest) -> Self {
        Self::new(&manifest.vocabulary, manifest.weighting)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Returns a `[1, len]` row and the number of input tokens that had no column.
    pub fn vectorize(&self, features: &FeatureVector) -> (Array2<f32>, usize) {
        let mut row = Array2::<f32>::zeros((1, self.len()));
        let total = features.total().max(1) as f32;
        let mut unknown = 0;

        for (token, count) in features.iter() {
            let Some(col) = self.column(token) else {
                unknown += 1;
                continue;
            };
            row[[0, col]] = match self.weighting {
                Weighting::Counts => count as f32,
                Weighting::Binary => 1.0,
                Weighting::Frequency => count as f32 / total,
            };
        }
        (row, unknown)
    }
}
