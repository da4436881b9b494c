use std::fs;

use wordbag::{Classifier, ClassifierError, ModelError, ModelManifest, ModelStore, Weighting};

fn sentiment_manifest() -> ModelManifest {
    ModelManifest::new(
        "sentiment",
        vec!["negative", "positive"],
        vec!["bad", "good", "great", "terrible"],
    )
    .with_version("3")
    .with_weighting(Weighting::Counts)
}

fn store_with_artifact() -> Result<(tempfile::TempDir, ModelStore), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path().join("models"))?;
    let source = dir.path().join("exported.onnx");
    fs::write(&source, b"not really an onnx graph")?;
    store.import_model(sentiment_manifest(), &source)?;
    Ok((dir, store))
}

#[test]
fn test_import_and_verify() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, store) = store_with_artifact()?;

    assert!(store.is_model_available("sentiment"));
    assert!(store.verify_model("sentiment")?);
    assert!(store.model_path("sentiment")?.ends_with("sentiment/model.onnx"));

    let manifest = store.read_manifest("sentiment")?;
    assert_eq!(manifest.version.as_deref(), Some("3"));
    assert_eq!(manifest.model_hash.as_ref().map(String::len), Some(64));
    Ok(())
}

#[test]
fn test_tampered_model_fails_verification() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, store) = store_with_artifact()?;
    fs::write(store.model_path("sentiment")?, "corrupted data")?;

    assert!(!store.verify_model("sentiment")?);
    assert!(matches!(
        store.load("sentiment"),
        Err(ModelError::HashMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_missing_model_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, store) = store_with_artifact()?;
    fs::remove_file(store.model_path("sentiment")?)?;

    assert!(!store.is_model_available("sentiment"));
    assert!(!store.verify_model("sentiment")?);
    Ok(())
}

#[test]
fn test_unparseable_graph_is_load_error() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, store) = store_with_artifact()?;
    assert!(matches!(store.load("sentiment"), Err(ModelError::LoadError(_))));

    let result = Classifier::builder().with_stored_model(&store, "sentiment");
    assert!(matches!(result, Err(ClassifierError::ModelError(_))));
    Ok(())
}

#[test]
fn test_list_and_remove() -> Result<(), Box<dyn std::error::Error>> {
    let (dir, store) = store_with_artifact()?;
    store.write_manifest(&ModelManifest::new("topics", vec!["sports", "tech"], vec!["goal"]))?;
    fs::create_dir_all(dir.path().join("models").join("stray"))?;

    assert_eq!(store.list_models()?, vec!["sentiment".to_string(), "topics".to_string()]);

    store.remove_model("topics")?;
    assert_eq!(store.list_models()?, vec!["sentiment".to_string()]);
    assert!(matches!(store.remove_model("topics"), Err(ModelError::NotFound(_))));
    Ok(())
}

#[test]
fn test_remove_cannot_leave_store() -> Result<(), Box<dyn std::error::Error>> {
    let (dir, store) = store_with_artifact()?;
    let precious = dir.path().join("precious");
    fs::create_dir_all(&precious)?;
    fs::write(precious.join("keep.txt"), b"keep")?;
    let absolute = precious.to_string_lossy().to_string();

    for name in ["..", absolute.as_str(), "sentiment/model.onnx", "../precious"] {
        assert!(
            matches!(store.remove_model(name), Err(ModelError::InvalidName(_))),
            "{name}"
        );
        assert!(matches!(store.read_manifest(name), Err(ModelError::InvalidName(_))));
        assert!(matches!(store.load(name), Err(ModelError::InvalidName(_))));
    }

    assert!(precious.join("keep.txt").exists());
    assert!(dir.path().join("exported.onnx").exists());
    assert!(store.verify_model("sentiment")?);
    Ok(())
}

#[test]
fn test_manifest_model_file_stays_in_artifact_dir() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, store) = store_with_artifact()?;
    let mut manifest = store.read_manifest("sentiment")?;
    manifest.model_file = "../../exported.onnx".into();
    fs::write(store.manifest_path("sentiment")?, serde_json::to_vec(&manifest)?)?;

    assert!(matches!(
        store.read_manifest("sentiment"),
        Err(ModelError::InvalidManifest(_))
    ));
    assert!(!store.is_model_available("sentiment"));
    Ok(())
}

#[test]
fn test_manifest_name_must_match_directory() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, store) = store_with_artifact()?;
    let mut manifest = store.read_manifest("sentiment")?;
    manifest.name = "other".into();
    fs::write(store.manifest_path("sentiment")?, serde_json::to_vec(&manifest)?)?;

    assert!(matches!(
        store.read_manifest("sentiment"),
        Err(ModelError::InvalidManifest(_))
    ));
    Ok(())
}

#[test]
fn test_malformed_manifest() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, store) = store_with_artifact()?;
    fs::write(store.manifest_path("sentiment")?, "{ not json")?;
    assert!(matches!(
        store.read_manifest("sentiment"),
        Err(ModelError::ManifestError(_))
    ));
    Ok(())
}

#[test]
fn test_unhashed_model_verifies_by_presence() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = ModelStore::new(dir.path())?;
    let manifest = ModelManifest::new("plain", vec!["a", "b"], vec!["x"]);
    store.write_manifest(&manifest)?;
    assert!(!store.verify_model("plain")?);

    fs::write(store.artifact_dir("plain")?.join("model.onnx"), b"bytes")?;
    assert!(store.verify_model("plain")?);
    Ok(())
}
