use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("invalid image: {0}")]
    InvalidImage(#[from] image::ImageError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("OCR request timed out after {0:?}")]
    Timeout(Duration),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("{0} OCR is not available in this build")]
    Unavailable(&'static str),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("OCR task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
