//! Fixed relative directory layout under a data root.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{ModelStore, StoreError};

const DATA_DIR: &str = "data";
const MODELS_DIR: &str = "models";
const UPLOADS_DIR: &str = "uploads";
pub const DATASET_CSV: &str = "synthetic_data.csv";
pub const DATASET_JSON: &str = "synthetic_data.json";

/// Paths of every persisted file, relative to one root directory.
///
/// ```text
/// <root>/data/synthetic_data.csv
/// <root>/data/synthetic_data.json
/// <root>/models/document_validator.json
/// <root>/models/model_metadata.json
/// <root>/uploads/
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join(MODELS_DIR)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn dataset_csv(&self) -> PathBuf {
        self.data_dir().join(DATASET_CSV)
    }

    pub fn dataset_json(&self) -> PathBuf {
        self.data_dir().join(DATASET_JSON)
    }

    pub fn model_store(&self) -> ModelStore {
        ModelStore::new(self.models_dir())
    }

    /// Create `data/`, `models/`, and `uploads/` if missing.
    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        for dir in [self.data_dir(), self.models_dir(), self.uploads_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        info!(root = %self.root.display(), "data directories ready");
        Ok(())
    }
}
