use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::classifier::{Model, OnnxModel};
use crate::models::{is_plain_file_name, ModelManifest, MANIFEST_FILE};
use crate::runtime::RuntimeConfig;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Manifest error: {0}")]
    ManifestError(#[from] serde_json::Error),
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("Invalid model name: {0:?}")]
    InvalidName(String),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
    #[error("Failed to load model: {0}")]
    LoadError(String),
}

/// Produces a ready model for an asset name.
///
/// The update listener calls this whenever a "model available" event arrives.
pub trait ModelLoader: Send + Sync {
    fn load_model(&self, name: &str) -> Result<Arc<dyn Model>, ModelError>;
}

/// Local directory of model artifacts, one subdirectory per asset name:
///
/// ```text
/// <models_dir>/<name>/manifest.json
/// <models_dir>/<name>/model.onnx
/// ```
#[derive(Debug, Clone)]
pub struct ModelStore {
    models_dir: PathBuf,
    runtime_config: RuntimeConfig,
}

impl ModelStore {
    /// Creates a new ModelStore with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("WORDBAG_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("wordbag").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("wordbag").join("models");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("wordbag").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            runtime_config: RuntimeConfig::default(),
        })
    }

    /// Sets the ONNX Runtime configuration used by [`ModelStore::load`].
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Directory holding the named artifact. Names that are not a single
    /// plain path component (`..`, absolute paths, `a/b`) are rejected.
    pub fn artifact_dir(&self, name: &str) -> Result<PathBuf, ModelError> {
        if !is_plain_file_name(name) {
            return Err(ModelError::InvalidName(name.to_string()));
        }
        Ok(self.models_dir.join(name))
    }

    pub fn manifest_path(&self, name: &str) -> Result<PathBuf, ModelError> {
        Ok(self.artifact_dir(name)?.join(MANIFEST_FILE))
    }

    /// Path of the model file declared by the stored manifest.
    pub fn model_path(&self, name: &str) -> Result<PathBuf, ModelError> {
        let manifest = self.read_manifest(name)?;
        Ok(self.artifact_dir(name)?.join(manifest.model_file))
    }

    pub fn is_model_available(&self, name: &str) -> bool {
        let available = self.model_path(name).map(|p| p.exists()).unwrap_or(false);
        log::debug!("Model '{}' available: {}", name, available);
        available
    }

    pub fn read_manifest(&self, name: &str) -> Result<ModelManifest, ModelError> {
        let path = self.manifest_path(name)?;
        if !path.exists() {
            return Err(ModelError::NotFound(name.to_string()));
        }
        let bytes = fs::read(&path)?;
        let manifest: ModelManifest = serde_json::from_slice(&bytes)?;
        manifest.validate()?;
        if manifest.name != name {
            return Err(ModelError::InvalidManifest(format!(
                "Manifest at {:?} names model '{}', expected '{}'",
                path, manifest.name, name
            )));
        }
        Ok(manifest)
    }

    pub fn write_manifest(&self, manifest: &ModelManifest) -> Result<(), ModelError> {
        manifest.validate()?;
        let dir = self.artifact_dir(&manifest.name)?;
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_vec_pretty(manifest)?;
        fs::write(dir.join(MANIFEST_FILE), json)?;
        log::info!("Wrote manifest for model '{}' to {:?}", manifest.name, dir);
        Ok(())
    }

    /// Copies `model_file` into the store under `manifest.name`, records its
    /// hash in the manifest and writes the manifest.
    pub fn import_model(
        &self,
        mut manifest: ModelManifest,
        model_file: impl AsRef<Path>,
    ) -> Result<ModelManifest, ModelError> {
        manifest.validate()?;
        let bytes = fs::read(model_file.as_ref())?;
        let dir = self.artifact_dir(&manifest.name)?;
        fs::create_dir_all(&dir)?;

        let hash = sha256_hex(&bytes);
        let target = dir.join(&manifest.model_file);
        log::info!("Importing {} bytes into {:?}", bytes.len(), target);
        fs::write(&target, &bytes)?;

        manifest.model_hash = Some(hash);
        self.write_manifest(&manifest)?;
        Ok(manifest)
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::debug!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks that the artifact exists and, when the manifest records a hash,
    /// that the model file still matches it.
    pub fn verify_model(&self, name: &str) -> Result<bool, ModelError> {
        let manifest = match self.read_manifest(name) {
            Ok(manifest) => manifest,
            Err(ModelError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let model_path = self.artifact_dir(name)?.join(&manifest.model_file);
        if !model_path.exists() {
            log::info!("Model file {:?} does not exist", model_path);
            return Ok(false);
        }

        match &manifest.model_hash {
            Some(expected) => {
                let ok = self.verify_file(&model_path, expected)?;
                log::info!("Model '{}' hash verification: {}", name, ok);
                Ok(ok)
            }
            None => {
                log::warn!("Model '{}' has no recorded hash, skipping integrity check", name);
                Ok(true)
            }
        }
    }

    /// Names of all artifacts with a readable manifest, sorted.
    pub fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.models_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if self.manifest_path(&name).is_ok_and(|path| path.exists()) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn remove_model(&self, name: &str) -> Result<(), ModelError> {
        let dir = self.artifact_dir(name)?;
        if !dir.exists() {
            return Err(ModelError::NotFound(name.to_string()));
        }
        fs::remove_dir_all(&dir)?;
        log::info!("Removed model '{}'", name);
        Ok(())
    }

    /// Verifies and loads the named artifact.
    pub fn load(&self, name: &str) -> Result<OnnxModel, ModelError> {
        log::info!("Loading model '{}' from {:?}", name, self.models_dir);
        let manifest = self.read_manifest(name)?;
        if !self.verify_model(name)? {
            return match &manifest.model_hash {
                Some(expected) => {
                    let path = self.artifact_dir(name)?.join(&manifest.model_file);
                    let actual = fs::read(&path).map(|b| sha256_hex(&b)).unwrap_or_default();
                    Err(ModelError::HashMismatch {
                        file_type: "model".to_string(),
                        expected: expected.clone(),
                        actual,
                    })
                }
                None => Err(ModelError::VerificationFailed),
            };
        }
        OnnxModel::load(self.artifact_dir(name)?, manifest, &self.runtime_config)
            .map_err(|e| ModelError::LoadError(e.to_string()))
    }
}

impl ModelLoader for ModelStore {
    fn load_model(&self, name: &str) -> Result<Arc<dyn Model>, ModelError> {
        Ok(Arc::new(self.load(name)?))
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models_dir() {
        // Test with environment variable
        env::set_var("WORDBAG_CACHE", "/tmp/test-wordbag-cache");
        let path = ModelStore::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("/tmp/test-wordbag-cache/models"));
        env::remove_var("WORDBAG_CACHE");

        // Test without environment variable
        let path = ModelStore::get_default_models_dir();
        assert!(path.to_str().unwrap().contains("wordbag/models"));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_missing_model_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        assert!(!store.is_model_available("absent"));
        assert!(!store.verify_model("absent").unwrap());
        assert!(matches!(store.read_manifest("absent"), Err(ModelError::NotFound(_))));
        assert!(matches!(store.load("absent"), Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_names_outside_store_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("models")).unwrap();
        for name in ["..", ".", "/abs", "a/b", ""] {
            assert!(matches!(store.artifact_dir(name), Err(ModelError::InvalidName(_))), "{name}");
            assert!(!store.is_model_available(name));
        }
    }
}
