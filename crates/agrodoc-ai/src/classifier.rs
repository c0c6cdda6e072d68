//! Trained scaler + model pipeline and the swappable live handle the service
//! reads from.

use std::collections::HashMap;
use std::sync::Arc;

use agrodoc_core::{FeatureSchema, InferenceFeatures, Prediction};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ModelError;
use crate::models::{Model, ModelKind};
use crate::scaler::StandardScaler;

/// A fitted `StandardScaler` followed by one classifier.
///
/// This is the unit that is persisted, reloaded, and served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedPipeline {
    pub schema: FeatureSchema,
    pub feature_names: Vec<String>,
    scaler: StandardScaler,
    model: Model,
}

impl TrainedPipeline {
    pub fn new(
        schema: FeatureSchema,
        feature_names: Vec<String>,
        scaler: StandardScaler,
        model: Model,
    ) -> Self {
        Self {
            schema,
            feature_names,
            scaler,
            model,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Predict from a vector in the pipeline's feature order.
    pub fn predict(&self, row: &[f64]) -> Result<Prediction, ModelError> {
        if row.len() != self.feature_names.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.feature_names.len(),
                actual: row.len(),
            });
        }
        let scaled = self.scaler.transform(row);
        Ok(Prediction::from_valid_probability(
            self.model.predict_proba(&scaled),
        ))
    }

    /// Predict from named features. Names the pipeline does not know are
    /// ignored; missing names read as 0.
    pub fn predict_named(&self, features: &HashMap<String, f64>) -> Result<Prediction, ModelError> {
        let row: Vec<f64> = self
            .feature_names
            .iter()
            .map(|name| features.get(name).copied().unwrap_or(0.0))
            .collect();
        self.predict(&row)
    }

    /// Predict from an inference feature vector, refusing pipelines trained on
    /// a different schema.
    pub fn predict_features(&self, features: &InferenceFeatures) -> Result<Prediction, ModelError> {
        if self.schema != FeatureSchema::Inference {
            return Err(ModelError::SchemaMismatch {
                model: self.schema,
                input: FeatureSchema::Inference,
            });
        }
        self.predict(&features.to_array())
    }
}

/// Shared, swappable reference to the live pipeline.
///
/// Readers clone the inner `Arc` and drop the lock immediately, so a swap
/// never waits on an in-flight prediction and earlier readers keep the
/// pipeline they started with.
#[derive(Debug, Clone, Default)]
pub struct ModelHandle {
    inner: Arc<RwLock<Option<Arc<TrainedPipeline>>>>,
}

impl ModelHandle {
    pub fn new(initial: Option<TrainedPipeline>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial.map(Arc::new))),
        }
    }

    pub async fn current(&self) -> Option<Arc<TrainedPipeline>> {
        self.inner.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Install a new pipeline, returning the one it replaced.
    pub async fn replace(&self, pipeline: TrainedPipeline) -> Option<Arc<TrainedPipeline>> {
        self.inner.write().await.replace(Arc::new(pipeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    fn pipeline(kind: ModelKind) -> TrainedPipeline {
        let (rows, labels) = fixtures::separable(15);
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform_all(&rows);
        TrainedPipeline::new(
            FeatureSchema::Corpus,
            vec!["signal".into(), "noise".into()],
            scaler,
            Model::fit(kind, &scaled, &labels, 42),
        )
    }

    #[test]
    fn predict_rejects_wrong_length() {
        let p = pipeline(ModelKind::LogisticRegression);
        let err = p.predict(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn named_features_resolve_by_name_and_default_to_zero() {
        let p = pipeline(ModelKind::LogisticRegression);
        let mut named = HashMap::new();
        named.insert("signal".to_string(), 2.0);
        named.insert("unrelated".to_string(), 99.0);
        let by_name = p.predict_named(&named).unwrap();
        let by_position = p.predict(&[2.0, 0.0]).unwrap();
        assert_eq!(by_name, by_position);
        assert!(by_name.is_valid);
    }

    #[test]
    fn probabilities_sum_to_one_and_confidence_is_max() {
        let p = pipeline(ModelKind::RandomForest);
        for row in [[-2.0, 0.3], [0.1, -0.5], [2.0, 0.9]] {
            let pred = p.predict(&row).unwrap();
            let probs = pred.probabilities;
            assert!((probs.invalid + probs.valid - 1.0).abs() < 1e-9);
            assert_eq!(pred.confidence, probs.invalid.max(probs.valid));
        }
    }

    #[test]
    fn inference_features_need_inference_schema() {
        let p = pipeline(ModelKind::LogisticRegression);
        let err = p.predict_features(&InferenceFeatures::default()).unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { .. }));
    }

    #[test]
    fn json_roundtrip_predicts_identically() {
        for kind in ModelKind::ALL {
            let p = pipeline(kind);
            let json = serde_json::to_string(&p).unwrap();
            let back: TrainedPipeline = serde_json::from_str(&json).unwrap();
            for row in [[-1.5, 0.2], [0.0, 0.0], [1.7, -0.4]] {
                assert_eq!(p.predict(&row).unwrap(), back.predict(&row).unwrap(), "{kind}");
            }
        }
    }

    #[tokio::test]
    async fn handle_swap_is_visible_and_old_arcs_survive() {
        let handle = ModelHandle::default();
        assert!(!handle.is_loaded().await);
        assert!(handle.current().await.is_none());

        handle.replace(pipeline(ModelKind::LogisticRegression)).await;
        let first = handle.current().await.unwrap();
        assert_eq!(first.kind(), ModelKind::LogisticRegression);

        let replaced = handle.replace(pipeline(ModelKind::RandomForest)).await;
        assert!(replaced.is_some());
        assert_eq!(handle.current().await.unwrap().kind(), ModelKind::RandomForest);

        // The reader that started before the swap still holds a working pipeline.
        assert!(first.predict(&[2.0, 0.0]).unwrap().is_valid);
    }
}
