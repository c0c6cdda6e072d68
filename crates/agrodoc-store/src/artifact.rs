//! Persisted classifier pipeline and its JSON metadata sidecar.
//!
//! Both files are written to a temporary file in the target directory and
//! renamed into place, so a reader never observes a half-written artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use agrodoc_core::FeatureSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::StoreError;

const ARTIFACT_FILE: &str = "document_validator.json";
const METADATA_FILE: &str = "model_metadata.json";

/// Sidecar describing a persisted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Winning algorithm, e.g. `random_forest`.
    pub model_type: String,
    /// RFC 3339 timestamp.
    pub trained_at: String,
    /// Feature order the pipeline expects.
    pub feature_names: Vec<String>,
    pub schema: FeatureSchema,
    /// Held-out accuracy of the winning pipeline.
    pub accuracy: f64,
}

/// Directory holding one pipeline artifact and its metadata.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(ARTIFACT_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Whether both files are present.
    pub fn exists(&self) -> bool {
        self.artifact_path().is_file() && self.metadata_path().is_file()
    }

    /// Persist a pipeline and its metadata. Returns the artifact path.
    pub fn save<T: Serialize>(
        &self,
        pipeline: &T,
        metadata: &ModelMetadata,
    ) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let artifact = self.artifact_path();
        write_json_atomic(&artifact, pipeline)?;
        write_json_atomic(&self.metadata_path(), metadata)?;
        info!(
            path = %artifact.display(),
            model_type = %metadata.model_type,
            schema = %metadata.schema,
            "saved model artifact"
        );
        Ok(artifact)
    }

    /// Load a pipeline and its metadata.
    pub fn load<T: DeserializeOwned>(&self) -> Result<(T, ModelMetadata), StoreError> {
        let artifact = self.artifact_path();
        let metadata_path = self.metadata_path();
        if !artifact.is_file() {
            return Err(StoreError::ModelNotFound(artifact));
        }
        if !metadata_path.is_file() {
            return Err(StoreError::ModelNotFound(metadata_path));
        }
        let pipeline: T = serde_json::from_slice(&std::fs::read(&artifact)?)?;
        let metadata: ModelMetadata = serde_json::from_slice(&std::fs::read(&metadata_path)?)?;
        info!(
            path = %artifact.display(),
            model_type = %metadata.model_type,
            trained_at = %metadata.trained_at,
            "loaded model artifact"
        );
        Ok((pipeline, metadata))
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        weights: Vec<f64>,
        bias: f64,
    }

    fn metadata() -> ModelMetadata {
        ModelMetadata {
            model_type: "logistic_regression".into(),
            trained_at: "2026-01-01T00:00:00+00:00".into(),
            feature_names: FeatureSchema::Inference
                .feature_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            schema: FeatureSchema::Inference,
            accuracy: 0.97,
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = ModelStore::new(tmp.path().join("models"));
        assert!(!store.exists());

        let model = Dummy {
            weights: vec![0.5, -1.25, 3.0],
            bias: 0.1,
        };
        let path = store.save(&model, &metadata()).unwrap();
        assert_eq!(path, store.artifact_path());
        assert!(store.exists());

        let (loaded, meta): (Dummy, ModelMetadata) = store.load().unwrap();
        assert_eq!(loaded, model);
        assert_eq!(meta, metadata());
    }

    #[test]
    fn load_missing_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = ModelStore::new(tmp.path());
        let result: Result<(Dummy, ModelMetadata), _> = store.load();
        assert!(matches!(result, Err(StoreError::ModelNotFound(_))));
    }

    #[test]
    fn save_replaces_previous_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = ModelStore::new(tmp.path());
        store
            .save(&Dummy { weights: vec![1.0], bias: 0.0 }, &metadata())
            .unwrap();
        store
            .save(&Dummy { weights: vec![2.0], bias: 1.0 }, &metadata())
            .unwrap();
        let (loaded, _): (Dummy, ModelMetadata) = store.load().unwrap();
        assert_eq!(loaded.weights, vec![2.0]);

        // No temp files left behind.
        let entries = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[test]
    fn metadata_sidecar_is_plain_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = ModelStore::new(tmp.path());
        store
            .save(&Dummy { weights: vec![], bias: 0.0 }, &metadata())
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.metadata_path()).unwrap())
                .unwrap();
        assert_eq!(raw["model_type"], "logistic_regression");
        assert_eq!(raw["schema"], "inference");
        assert_eq!(raw["feature_names"].as_array().unwrap().len(), 9);
    }
}
