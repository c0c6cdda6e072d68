//! Storage layer: data directory layout, synthetic dataset snapshots (CSV via
//! Arrow, JSON), and the persisted classifier artifact with its metadata sidecar.

mod artifact;
mod dataset;
mod error;
mod layout;

pub use artifact::{ModelMetadata, ModelStore};
pub use dataset::{read_dataset_csv, write_dataset_csv, write_dataset_json};
pub use error::StoreError;
pub use layout::{DATASET_CSV, DATASET_JSON, DataLayout};
