//! Shared sample and prediction types exchanged between the generator, the
//! dataset store, and the trainer.

use serde::{Deserialize, Serialize};

use crate::features::CorpusStatistics;

/// Document type tag for every negative sample.
pub const INVALID_DOCUMENT_TYPE: &str = "invalid";

/// One labeled synthetic training sample.
///
/// Written once to the dataset snapshots; never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSample {
    /// Sequential id, `doc_0001` onward.
    pub id: String,
    pub text: String,
    pub is_valid: bool,
    /// One of the valid document type tags, or [`INVALID_DOCUMENT_TYPE`].
    pub document_type: String,
    /// RFC 3339 timestamp string.
    pub generated_at: String,
    #[serde(flatten)]
    pub stats: CorpusStatistics,
}

/// Class probabilities for the binary validity label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub invalid: f64,
    pub valid: f64,
}

/// Classifier output for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub is_valid: bool,
    /// Highest class probability.
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
}

impl Prediction {
    pub fn from_valid_probability(p_valid: f64) -> Self {
        let p_valid = p_valid.clamp(0.0, 1.0);
        let probabilities = ClassProbabilities {
            invalid: 1.0 - p_valid,
            valid: p_valid,
        };
        Self {
            is_valid: p_valid > 0.5,
            confidence: probabilities.invalid.max(probabilities.valid),
            probabilities,
        }
    }
}
