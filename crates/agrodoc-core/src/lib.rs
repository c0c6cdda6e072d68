//! Core types for agrodoc: the versioned term catalog, rigorous feature
//! extraction, feature schemas, and shared sample types.

mod error;
pub mod features;
pub mod sample;
pub mod schema;
pub mod terms;

pub use error::CoreError;
pub use features::{
    Assessment, CorpusStatistics, FEATURE_COUNT, FeatureExtractor, InferenceFeatures,
    RigorousReport,
};
pub use sample::{ClassProbabilities, INVALID_DOCUMENT_TYPE, Prediction, SyntheticSample};
pub use schema::{FeatureSchema, dataset};
pub use terms::TermCatalog;
