use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("term catalog parse error: {0}")]
    CatalogParse(#[from] serde_json::Error),

    #[error("term catalog not readable at {path}: {source}")]
    CatalogIo {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("invalid term catalog: {0}")]
    InvalidCatalog(String),

    #[error("pattern compile error: {0}")]
    Pattern(#[from] regex::Error),
}
