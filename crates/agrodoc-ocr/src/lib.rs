//! OCR adapter: decode an upload, pull text out of it with the first strategy
//! that succeeds, and gate the text on whether it looks like a property
//! document.
//!
//! Strategies are [`TextExtractor`]s. The hosted extractor calls Mistral's
//! chat-completions API; the local one runs Tesseract when built with the
//! `tesseract` feature.

pub mod decode;
mod error;
pub mod extractor;
pub mod gate;
pub mod local;
pub mod mistral;
pub mod pipeline;

pub use decode::DecodedImage;
pub use error::OcrError;
pub use extractor::{Extraction, TextExtractor, first_success};
pub use gate::{DocumentGate, DocumentKind, Rejection, StructuredInfo};
pub use local::TesseractExtractor;
pub use mistral::MistralExtractor;
pub use pipeline::{OcrOutcome, OcrPipeline};
