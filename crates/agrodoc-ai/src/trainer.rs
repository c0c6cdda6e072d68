//! Model selection: stratified split, three candidate pipelines, held-out
//! evaluation, and the winner's report.

use std::collections::HashMap;

use agrodoc_core::{FeatureExtractor, FeatureSchema, Prediction, SyntheticSample};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::info;

use crate::ModelError;
use crate::classifier::TrainedPipeline;
use crate::models::{Model, ModelKind};
use crate::scaler::StandardScaler;

/// Seed for the split and every candidate model.
pub const DEFAULT_SEED: u64 = 42;
const TEST_FRACTION: f64 = 0.2;

/// Labeled feature rows in one schema.
#[derive(Debug, Clone)]
pub struct TrainingTable {
    pub schema: FeatureSchema,
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<bool>,
}

impl TrainingTable {
    /// Build a table from samples. The inference schema re-extracts features
    /// from each text; the corpus schema uses the stored statistics.
    pub fn from_samples(
        samples: &[SyntheticSample],
        schema: FeatureSchema,
        extractor: &FeatureExtractor,
    ) -> Self {
        let rows = samples
            .iter()
            .map(|s| match schema {
                FeatureSchema::Inference => extractor.extract(&s.text).0.to_vec(),
                FeatureSchema::Corpus => s.stats.to_vec(),
            })
            .collect();
        Self {
            schema,
            feature_names: schema.feature_names().iter().map(|s| s.to_string()).collect(),
            rows,
            labels: samples.iter().map(|s| s.is_valid).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn select(&self, idx: &[usize]) -> (Vec<Vec<f64>>, Vec<bool>) {
        (
            idx.iter().map(|&i| self.rows[i].clone()).collect(),
            idx.iter().map(|&i| self.labels[i]).collect(),
        )
    }
}

/// Train and test row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Per-class shuffled split preserving the label ratio. Each class puts
/// `round(n·fraction)` rows in the test set, at least one and never all.
pub fn stratified_split(
    labels: &[bool],
    test_fraction: f64,
    seed: u64,
) -> Result<Split, ModelError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [false, true] {
        let mut members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        if members.len() < 2 {
            return Err(ModelError::InsufficientData(format!(
                "need at least 2 {} samples, found {}",
                if class { "valid" } else { "invalid" },
                members.len()
            )));
        }
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_fraction).round() as usize)
            .clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

// ── Evaluation ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(actual: &[bool], predicted: &[bool]) -> Self {
        let mut m = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (false, false) => m.true_negative += 1,
                (false, true) => m.false_positive += 1,
                (true, false) => m.false_negative += 1,
                (true, true) => m.true_positive += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_negative + self.true_positive) as f64 / total as f64
    }

    /// Metrics for the `valid` class when `positive`, else for `invalid`.
    pub fn class_metrics(&self, positive: bool) -> ClassMetrics {
        let (tp, fp, fn_) = if positive {
            (self.true_positive, self.false_positive, self.false_negative)
        } else {
            (self.true_negative, self.false_negative, self.false_positive)
        };
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub kind: ModelKind,
    pub accuracy: f64,
}

/// Everything learned about one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub schema: FeatureSchema,
    pub train_size: usize,
    pub test_size: usize,
    pub candidates: Vec<CandidateScore>,
    pub best: ModelKind,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub invalid: ClassMetrics,
    pub valid: ClassMetrics,
    /// `(feature, importance)` sorted descending; only for a winning forest.
    pub feature_importances: Option<Vec<(String, f64)>>,
}

// ── Trainer ──

/// Fits candidate pipelines and keeps the most accurate one.
pub struct Trainer {
    seed: u64,
    fitted: Option<(TrainedPipeline, TrainingReport)>,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Trainer {
    pub fn new(seed: u64) -> Self {
        Self { seed, fitted: None }
    }

    /// Train all candidates on an 80/20 stratified split. A later candidate
    /// wins only with strictly higher held-out accuracy.
    pub fn fit(&mut self, table: &TrainingTable) -> Result<&TrainingReport, ModelError> {
        if table.rows.len() != table.labels.len() {
            return Err(ModelError::InsufficientData(format!(
                "{} rows but {} labels",
                table.rows.len(),
                table.labels.len()
            )));
        }
        if let Some(row) = table.rows.iter().find(|r| r.len() != table.feature_names.len()) {
            return Err(ModelError::DimensionMismatch {
                expected: table.feature_names.len(),
                actual: row.len(),
            });
        }

        let split = stratified_split(&table.labels, TEST_FRACTION, self.seed)?;
        let (train_x, train_y) = table.select(&split.train);
        let (test_x, test_y) = table.select(&split.test);
        info!(
            schema = %table.schema,
            train = train_x.len(),
            test = test_x.len(),
            "split training data"
        );

        let scaler = StandardScaler::fit(&train_x);
        let train_scaled = scaler.transform_all(&train_x);
        let test_scaled = scaler.transform_all(&test_x);

        let mut candidates = Vec::with_capacity(ModelKind::ALL.len());
        let mut best: Option<(Model, Vec<bool>, f64)> = None;

        for kind in ModelKind::ALL {
            let model = Model::fit(kind, &train_scaled, &train_y, self.seed);
            let predicted: Vec<bool> = test_scaled
                .iter()
                .map(|row| model.predict_proba(row) > 0.5)
                .collect();
            let accuracy = ConfusionMatrix::from_predictions(&test_y, &predicted).accuracy();
            info!(model = %kind, accuracy, "evaluated candidate");
            candidates.push(CandidateScore { kind, accuracy });

            if best.as_ref().is_none_or(|(_, _, top)| accuracy > *top) {
                best = Some((model, predicted, accuracy));
            }
        }

        let Some((model, predicted, accuracy)) = best else {
            return Err(ModelError::NotTrained);
        };
        let confusion = ConfusionMatrix::from_predictions(&test_y, &predicted);
        let feature_importances = model.feature_importances().map(|imp| {
            let mut ranked: Vec<(String, f64)> =
                table.feature_names.iter().cloned().zip(imp.iter().copied()).collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            ranked
        });

        let report = TrainingReport {
            schema: table.schema,
            train_size: train_x.len(),
            test_size: test_x.len(),
            candidates,
            best: model.kind(),
            accuracy,
            confusion,
            invalid: confusion.class_metrics(false),
            valid: confusion.class_metrics(true),
            feature_importances,
        };
        info!(best = %report.best, accuracy, "selected model");

        let pipeline =
            TrainedPipeline::new(table.schema, table.feature_names.clone(), scaler, model);
        let (_, report) = self.fitted.insert((pipeline, report));
        Ok(&*report)
    }

    pub fn pipeline(&self) -> Result<&TrainedPipeline, ModelError> {
        self.fitted.as_ref().map(|(p, _)| p).ok_or(ModelError::NotTrained)
    }

    pub fn report(&self) -> Result<&TrainingReport, ModelError> {
        self.fitted.as_ref().map(|(_, r)| r).ok_or(ModelError::NotTrained)
    }

    pub fn predict(&self, row: &[f64]) -> Result<Prediction, ModelError> {
        self.pipeline()?.predict(row)
    }

    pub fn predict_named(&self, features: &HashMap<String, f64>) -> Result<Prediction, ModelError> {
        self.pipeline()?.predict_named(features)
    }

    /// Consume the trainer, yielding the fitted pipeline and its report.
    pub fn into_fitted(self) -> Result<(TrainedPipeline, TrainingReport), ModelError> {
        self.fitted.ok_or(ModelError::NotTrained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SyntheticGenerator;

    fn toy_table(n_per_class: usize) -> TrainingTable {
        let (rows, labels) = crate::models::fixtures::separable(n_per_class);
        TrainingTable {
            schema: FeatureSchema::Corpus,
            feature_names: vec!["signal".into(), "noise".into()],
            rows,
            labels,
        }
    }

    #[test]
    fn split_is_stratified_and_disjoint() {
        let labels: Vec<bool> = (0..100).map(|i| i % 10 < 7).collect();
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(split.train.len() + split.test.len(), 100);
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.test.iter().filter(|&&i| labels[i]).count(), 14);
        assert!(split.train.iter().all(|i| !split.test.contains(i)));
    }

    #[test]
    fn split_keeps_both_classes_on_tiny_data() {
        let labels = vec![true, true, false, false, true];
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        for side in [&split.train, &split.test] {
            assert!(side.iter().any(|&i| labels[i]));
            assert!(side.iter().any(|&i| !labels[i]));
        }
    }

    #[test]
    fn split_requires_two_per_class() {
        let err = stratified_split(&[true, true, true, false], 0.2, 42).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData(_)));
    }

    #[test]
    fn split_is_reproducible() {
        let labels: Vec<bool> = (0..50).map(|i| i % 3 == 0).collect();
        assert_eq!(
            stratified_split(&labels, 0.2, 42).unwrap(),
            stratified_split(&labels, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn predict_before_fit_is_not_trained() {
        let trainer = Trainer::default();
        assert!(matches!(trainer.predict(&[0.0; 9]), Err(ModelError::NotTrained)));
        assert!(matches!(
            trainer.predict_named(&HashMap::new()),
            Err(ModelError::NotTrained)
        ));
        assert!(matches!(trainer.into_fitted(), Err(ModelError::NotTrained)));
    }

    #[test]
    fn fit_selects_a_perfect_candidate_on_toy_data() {
        let mut trainer = Trainer::default();
        let report = trainer.fit(&toy_table(25)).unwrap();
        assert_eq!(report.candidates.len(), 3);
        assert_eq!(report.accuracy, 1.0);
        // All candidates are perfect, so the first one wins the tie.
        assert_eq!(report.best, ModelKind::RandomForest);
        assert_eq!(report.confusion.total(), report.test_size);
        assert_eq!(report.valid.recall, 1.0);
        let importances = report.feature_importances.as_ref().unwrap();
        assert_eq!(importances[0].0, "signal");

        let p = trainer.predict(&[2.0, 0.0]).unwrap();
        assert!(p.is_valid);
    }

    #[test]
    fn fit_rejects_ragged_rows() {
        let mut table = toy_table(5);
        table.rows[3].push(1.0);
        let err = Trainer::default().fit(&table).unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { .. }));
    }

    #[test]
    fn confusion_metrics() {
        let actual = [true, true, true, false, false];
        let predicted = [true, true, false, false, true];
        let m = ConfusionMatrix::from_predictions(&actual, &predicted);
        assert_eq!(m.true_positive, 2);
        assert_eq!(m.false_negative, 1);
        assert_eq!(m.false_positive, 1);
        assert_eq!(m.true_negative, 1);
        assert!((m.accuracy() - 0.6).abs() < 1e-12);

        let valid = m.class_metrics(true);
        assert!((valid.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((valid.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(valid.support, 3);
        let invalid = m.class_metrics(false);
        assert_eq!(invalid.support, 2);
        assert!((invalid.precision - 0.5).abs() < 1e-12);
    }

    #[test]
    fn synthetic_corpus_trains_on_inference_schema() {
        let extractor = FeatureExtractor::builtin().unwrap();
        let samples = SyntheticGenerator::new(&extractor, 42).generate_dataset(120);
        let table = TrainingTable::from_samples(&samples, FeatureSchema::Inference, &extractor);
        assert_eq!(table.len(), 120);
        assert_eq!(table.feature_names.len(), 9);

        let mut trainer = Trainer::default();
        let report = trainer.fit(&table).unwrap();
        assert!(report.accuracy >= 0.9, "accuracy {}", report.accuracy);
        assert_eq!(trainer.pipeline().unwrap().schema, FeatureSchema::Inference);
    }

    #[test]
    fn synthetic_corpus_trains_on_corpus_schema() {
        let extractor = FeatureExtractor::builtin().unwrap();
        let samples = SyntheticGenerator::new(&extractor, 42).generate_dataset(120);
        let table = TrainingTable::from_samples(&samples, FeatureSchema::Corpus, &extractor);

        let mut trainer = Trainer::default();
        let report = trainer.fit(&table).unwrap();
        assert!(report.accuracy >= 0.9, "accuracy {}", report.accuracy);
        assert_eq!(report.schema, FeatureSchema::Corpus);
    }

    #[test]
    fn same_seed_trains_the_same_model() {
        let extractor = FeatureExtractor::builtin().unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let run = || {
            let samples = SyntheticGenerator::new(&extractor, 42)
                .with_reference_date(day)
                .generate_dataset(1000);
            let table = TrainingTable::from_samples(&samples, FeatureSchema::Inference, &extractor);
            Trainer::new(42).fit(&table).unwrap().clone()
        };

        let first = run();
        let second = run();
        assert_eq!(first.best, second.best);
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(first.accuracy, second.accuracy);
        assert_eq!(first.confusion, second.confusion);
        assert_eq!(first.train_size, 800);
        assert_eq!(first.test_size, 200);
    }
}
