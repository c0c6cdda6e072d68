//! Local OCR with Tesseract.
//!
//! Compiled only with the `tesseract` feature; without it the extractor
//! stays in the chain and reports itself unavailable.

use async_trait::async_trait;
use tracing::debug;

use crate::decode::DecodedImage;
use crate::extractor::TextExtractor;
use crate::OcrError;

pub const DEFAULT_LANGUAGE: &str = "por";

pub struct TesseractExtractor {
    language: String,
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl TesseractExtractor {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    fn method(&self) -> &'static str {
        "tesseract"
    }

    #[cfg(feature = "tesseract")]
    async fn extract(&self, image: &DecodedImage) -> Result<Option<String>, OcrError> {
        let png = image.grayscale_png()?;
        let language = self.language.clone();
        debug!(language = %language, bytes = png.len(), "running tesseract");
        let text = tokio::task::spawn_blocking(move || recognize(&png, &language)).await??;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    #[cfg(not(feature = "tesseract"))]
    async fn extract(&self, _image: &DecodedImage) -> Result<Option<String>, OcrError> {
        debug!(language = %self.language, "tesseract not compiled in");
        Err(OcrError::Unavailable("tesseract"))
    }
}

#[cfg(feature = "tesseract")]
fn recognize(png: &[u8], language: &str) -> Result<String, OcrError> {
    use tesseract::{PageSegMode, Tesseract};

    let engine = |e: &dyn std::fmt::Display| OcrError::Engine(e.to_string());
    let mut tess = Tesseract::new(None, Some(language))
        .map_err(|e| engine(&e))?
        .set_image_from_mem(png)
        .map_err(|e| engine(&e))?;
    tess.set_page_seg_mode(PageSegMode::PsmSingleBlock);
    tess.get_text().map_err(|e| engine(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_portuguese() {
        assert_eq!(TesseractExtractor::default().language(), "por");
    }

    #[cfg(not(feature = "tesseract"))]
    #[tokio::test]
    async fn reports_unavailable_without_feature() {
        let image = DecodedImage::decode(&crate::decode::fixtures::png_bytes()).unwrap();
        let err = TesseractExtractor::default().extract(&image).await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable("tesseract")));
    }
}
