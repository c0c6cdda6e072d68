//! Feature schemas and Arrow schema definitions for the training dataset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Column order of the inference feature vector (schema A).
pub const INFERENCE_FEATURES: [&str; 9] = [
    "type_terms",
    "agro_terms",
    "disqualifying_penalty",
    "dates",
    "identifiers",
    "money_mentions",
    "area_measures",
    "length_norm",
    "words_norm",
];

/// Column order of the corpus statistics vector (schema B).
pub const CORPUS_FEATURES: [&str; 9] = [
    "legal_terms_count",
    "has_dates",
    "text_length",
    "number_count",
    "special_chars_count",
    "legal_density",
    "keywords_present",
    "has_coordinates",
    "uppercase_ratio",
];

/// Which of the two feature layouts a vector or model uses.
///
/// The layouts are positionally incompatible. A model trained on one must
/// only ever be fed vectors of the same schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSchema {
    /// Keyword/regex counts produced by the rigorous extractor. Canonical.
    Inference,
    /// Descriptive statistics derived alongside synthetic samples.
    Corpus,
}

impl FeatureSchema {
    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            Self::Inference => &INFERENCE_FEATURES,
            Self::Corpus => &CORPUS_FEATURES,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inference => "inference",
            Self::Corpus => "corpus",
        }
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inference" | "a" => Ok(Self::Inference),
            "corpus" | "b" => Ok(Self::Corpus),
            other => Err(format!("unknown feature schema: {other}")),
        }
    }
}

/// Arrow schemas for persisted synthetic datasets.
pub mod dataset {
    use arrow::datatypes::{DataType, Field, Schema};

    pub const ID: &str = "id";
    pub const TEXT: &str = "text";
    pub const IS_VALID: &str = "is_valid";
    pub const DOCUMENT_TYPE: &str = "document_type";
    pub const GENERATED_AT: &str = "generated_at";

    /// Schema for one synthetic sample row: identity, text, label, and the
    /// nine corpus statistics columns.
    pub fn synthetic_sample_schema() -> Schema {
        Schema::new(vec![
            Field::new(ID, DataType::Utf8, false),
            Field::new(TEXT, DataType::Utf8, false),
            Field::new(IS_VALID, DataType::Boolean, false),
            Field::new(DOCUMENT_TYPE, DataType::Utf8, false),
            // RFC 3339 string; kept as text so CSV round-trips without tz parsing.
            Field::new(GENERATED_AT, DataType::Utf8, false),
            Field::new("legal_terms_count", DataType::Int64, false),
            Field::new("has_dates", DataType::Int64, false),
            Field::new("text_length", DataType::Int64, false),
            Field::new("number_count", DataType::Int64, false),
            Field::new("special_chars_count", DataType::Int64, false),
            Field::new("legal_density", DataType::Float64, false),
            Field::new("keywords_present", DataType::Int64, false),
            Field::new("has_coordinates", DataType::Int64, false),
            Field::new("uppercase_ratio", DataType::Float64, false),
        ])
    }
}
