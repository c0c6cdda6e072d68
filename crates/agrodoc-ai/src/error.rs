use agrodoc_core::FeatureSchema;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model has not been trained")]
    NotTrained,

    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model was trained on the {model} feature schema but received {input} features")]
    SchemaMismatch {
        model: FeatureSchema,
        input: FeatureSchema,
    },

    #[error("insufficient training data: {0}")]
    InsufficientData(String),
}
