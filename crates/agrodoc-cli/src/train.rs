//! Dataset generation and the train → persist → reload pipeline shared by
//! `agrodoc generate`, `agrodoc train`, and `POST /train-model`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use agrodoc_ai::{DatasetSummary, SyntheticGenerator, TrainedPipeline, Trainer, TrainingReport, TrainingTable};
use agrodoc_core::{FeatureExtractor, FeatureSchema};
use agrodoc_store::{DataLayout, ModelMetadata, read_dataset_csv, write_dataset_csv, write_dataset_json};
use anyhow::Context;
use tracing::info;

/// Samples generated when training finds no dataset on disk.
pub const SAMPLES_IF_MISSING: usize = 1000;

pub struct TrainOptions {
    pub dataset: PathBuf,
    pub schema: FeatureSchema,
    pub seed: u64,
    /// Generate this many samples first when `dataset` does not exist.
    pub generate_if_missing: Option<usize>,
}

pub struct TrainOutcome {
    pub report: TrainingReport,
    /// The pipeline as reloaded from disk.
    pub pipeline: TrainedPipeline,
    pub metadata: ModelMetadata,
    pub model_path: PathBuf,
    pub elapsed_secs: f64,
}

/// Generate `n` samples and write the CSV and JSON snapshots.
pub fn generate_dataset(
    extractor: &FeatureExtractor,
    n: usize,
    seed: u64,
    csv: &Path,
    json: &Path,
) -> anyhow::Result<DatasetSummary> {
    if let Some(dir) = csv.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let samples = SyntheticGenerator::new(extractor, seed).generate_dataset(n);
    write_dataset_csv(&samples, csv).with_context(|| format!("writing {}", csv.display()))?;
    write_dataset_json(&samples, json).with_context(|| format!("writing {}", json.display()))?;

    let summary = DatasetSummary::from_samples(&samples);
    info!(
        total = summary.total,
        valid = summary.valid,
        invalid = summary.invalid,
        csv = %csv.display(),
        "dataset written"
    );
    Ok(summary)
}

/// Train all candidates, persist the winner, and reload it from disk.
///
/// The artifact on disk is only replaced once training has fully succeeded.
pub fn train_and_persist(
    layout: &DataLayout,
    extractor: &FeatureExtractor,
    opts: &TrainOptions,
) -> anyhow::Result<TrainOutcome> {
    let start = Instant::now();

    // 1. Make sure there is a dataset.
    if !opts.dataset.exists() {
        if let Some(n) = opts.generate_if_missing {
            info!(path = %opts.dataset.display(), samples = n, "no dataset, generating one");
            let json = opts.dataset.with_extension("json");
            generate_dataset(extractor, n, opts.seed, &opts.dataset, &json)?;
        }
    }

    // 2. Load and featurize.
    let samples = read_dataset_csv(&opts.dataset)
        .with_context(|| format!("reading dataset {}", opts.dataset.display()))?;
    let table = TrainingTable::from_samples(&samples, opts.schema, extractor);
    info!(rows = table.len(), schema = %opts.schema, "training table ready");

    // 3. Fit candidates and keep the best.
    let mut trainer = Trainer::new(opts.seed);
    trainer.fit(&table).context("training classifier")?;
    let (pipeline, report) = trainer.into_fitted()?;

    // 4. Persist, then reload what was written.
    let metadata = ModelMetadata {
        model_type: report.best.as_str().to_string(),
        trained_at: chrono::Utc::now().to_rfc3339(),
        feature_names: pipeline.feature_names.clone(),
        schema: pipeline.schema,
        accuracy: report.accuracy,
    };
    let store = layout.model_store();
    std::fs::create_dir_all(layout.models_dir())
        .with_context(|| format!("creating {}", layout.models_dir().display()))?;
    let model_path = store.save(&pipeline, &metadata).context("saving model")?;
    let (pipeline, metadata) = store
        .load::<TrainedPipeline>()
        .context("reloading saved model")?;

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        model = %metadata.model_type,
        accuracy = metadata.accuracy,
        path = %model_path.display(),
        elapsed_secs,
        "model trained and saved"
    );
    Ok(TrainOutcome {
        report,
        pipeline,
        metadata,
        model_path,
        elapsed_secs,
    })
}

/// Load the persisted pipeline if there is one.
pub fn load_model(layout: &DataLayout) -> anyhow::Result<Option<TrainedPipeline>> {
    let store = layout.model_store();
    if !store.exists() {
        info!(dir = %layout.models_dir().display(), "no persisted model");
        return Ok(None);
    }
    let (pipeline, metadata) = store
        .load::<TrainedPipeline>()
        .context("loading persisted model")?;
    info!(
        model = %metadata.model_type,
        schema = %metadata.schema,
        trained_at = %metadata.trained_at,
        "loaded persisted model"
    );
    Ok(Some(pipeline))
}
