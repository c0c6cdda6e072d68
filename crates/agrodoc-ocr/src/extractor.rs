//! Text extraction strategies and the first-success combinator.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::decode::DecodedImage;
use crate::OcrError;

/// One way of turning an image into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Name reported as the OCR method, e.g. `mistral`.
    fn method(&self) -> &'static str;

    /// Extracted text, or `None` when the strategy ran but found nothing
    /// usable.
    async fn extract(&self, image: &DecodedImage) -> Result<Option<String>, OcrError>;
}

/// Text produced by [`first_success`], or the last method tried when none
/// produced any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: Option<String>,
    pub method: &'static str,
}

/// Run strategies in order and stop at the first non-empty text. Errors are
/// logged and treated as "no text".
pub async fn first_success(
    extractors: &[Box<dyn TextExtractor>],
    image: &DecodedImage,
) -> Extraction {
    let mut method = "none";
    for extractor in extractors {
        method = extractor.method();
        match extractor.extract(image).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                info!(method, chars = text.chars().count(), "extracted text");
                return Extraction {
                    text: Some(text),
                    method,
                };
            }
            Ok(_) => info!(method, "no text extracted"),
            Err(e) => warn!(method, error = %e, "text extraction failed"),
        }
    }
    Extraction { text: None, method }
}
