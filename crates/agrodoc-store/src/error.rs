use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("model artifact not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("dataset is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("null value in column '{column}' at row {row}")]
    NullValue { column: &'static str, row: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
