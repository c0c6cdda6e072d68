//! Upload → text, with the document gate applied.

use serde::Serialize;
use tracing::{info, warn};

use crate::decode::DecodedImage;
use crate::extractor::{TextExtractor, first_success};
use crate::gate::DocumentGate;

/// Result of processing one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrOutcome {
    pub success: bool,
    pub text: String,
    pub error: Option<String>,
    pub method: String,
}

impl OcrOutcome {
    fn failure(text: String, error: impl Into<String>, method: &str) -> Self {
        Self {
            success: false,
            text,
            error: Some(error.into()),
            method: method.to_string(),
        }
    }
}

pub struct OcrPipeline {
    extractors: Vec<Box<dyn TextExtractor>>,
    gate: DocumentGate,
}

impl OcrPipeline {
    /// Strategies run in the given order.
    pub fn new(extractors: Vec<Box<dyn TextExtractor>>, gate: DocumentGate) -> Self {
        Self { extractors, gate }
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.method()).collect()
    }

    pub fn gate(&self) -> &DocumentGate {
        &self.gate
    }

    pub async fn process(&self, bytes: &[u8]) -> OcrOutcome {
        let image = match DecodedImage::decode(bytes) {
            Ok(image) => image,
            Err(e) => {
                warn!(bytes = bytes.len(), error = %e, "upload is not a readable image");
                return OcrOutcome::failure(String::new(), "invalid image", "none");
            }
        };

        let extraction = first_success(&self.extractors, &image).await;
        let text = extraction.text.unwrap_or_default();
        match self.gate.check(&text) {
            Ok(()) => {
                info!(method = extraction.method, chars = text.chars().count(), "document accepted by OCR gate");
                OcrOutcome {
                    success: true,
                    text,
                    error: None,
                    method: extraction.method.to_string(),
                }
            }
            Err(rejection) => {
                info!(method = extraction.method, reason = %rejection, "document rejected by OCR gate");
                OcrOutcome::failure(text, rejection.to_string(), extraction.method)
            }
        }
    }
}
