//! Learning layer: synthetic corpus generation, hand-rolled classifiers,
//! model selection, and the served scaler + model pipeline.

mod classifier;
mod error;
pub mod generator;
pub mod models;
mod scaler;
pub mod trainer;

pub use classifier::{ModelHandle, TrainedPipeline};
pub use error::ModelError;
pub use generator::{DatasetSummary, SyntheticGenerator};
pub use models::ModelKind;
pub use scaler::StandardScaler;
pub use trainer::{Trainer, TrainingReport, TrainingTable};
