//! Binary classifiers over standardized feature rows.
//!
//! Every model is fitted on rows already passed through the pipeline's
//! scaler and outputs the probability of the `valid` class.

mod forest;
mod logistic;
mod svm;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use forest::RandomForest;
pub use logistic::LogisticRegression;
pub use svm::Svm;

/// Candidate algorithms, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    LogisticRegression,
    Svm,
}

impl ModelKind {
    /// All candidates in the order they are trained and compared.
    pub const ALL: [ModelKind; 3] = [Self::RandomForest, Self::LogisticRegression, Self::Svm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RandomForest => "random_forest",
            Self::LogisticRegression => "logistic_regression",
            Self::Svm => "svm",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fitted classifier of any kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Model {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
    Svm(Svm),
}

impl Model {
    /// Fit a model of `kind`. `seed` drives every random choice the
    /// algorithm makes.
    pub fn fit(kind: ModelKind, rows: &[Vec<f64>], labels: &[bool], seed: u64) -> Self {
        match kind {
            ModelKind::RandomForest => Self::RandomForest(RandomForest::fit(rows, labels, seed)),
            ModelKind::LogisticRegression => {
                Self::LogisticRegression(LogisticRegression::fit(rows, labels))
            }
            ModelKind::Svm => Self::Svm(Svm::fit(rows, labels, seed)),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::RandomForest(_) => ModelKind::RandomForest,
            Self::LogisticRegression(_) => ModelKind::LogisticRegression,
            Self::Svm(_) => ModelKind::Svm,
        }
    }

    /// Probability of the `valid` class for one standardized row.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        match self {
            Self::RandomForest(m) => m.predict_proba(row),
            Self::LogisticRegression(m) => m.predict_proba(row),
            Self::Svm(m) => m.predict_proba(row),
        }
    }

    /// Mean-impurity-decrease importances, forest only.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            Self::RandomForest(m) => Some(m.feature_importances()),
            _ => None,
        }
    }
}

/// Numerically stable logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Two well-separated clusters along the first axis with a noise axis.
    pub fn separable(n_per_class: usize) -> (Vec<Vec<f64>>, Vec<bool>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n_per_class {
            let jitter = (i as f64 * 0.37).sin() * 0.3;
            rows.push(vec![-2.0 + jitter, (i as f64 * 0.91).cos()]);
            labels.push(false);
            rows.push(vec![2.0 - jitter, (i as f64 * 0.53).sin()]);
            labels.push(true);
        }
        (rows, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_separates_toy_problem() {
        let (rows, labels) = fixtures::separable(30);
        for kind in ModelKind::ALL {
            let model = Model::fit(kind, &rows, &labels, 42);
            assert_eq!(model.kind(), kind);
            assert!(model.predict_proba(&[2.0, 0.0]) > 0.5, "{kind} valid side");
            assert!(model.predict_proba(&[-2.0, 0.0]) < 0.5, "{kind} invalid side");
        }
    }

    #[test]
    fn model_json_is_tagged_by_kind() {
        let (rows, labels) = fixtures::separable(5);
        let model = Model::fit(ModelKind::LogisticRegression, &rows, &labels, 42);
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["type"], "logistic_regression");

        let back: Model = serde_json::from_value(json).unwrap();
        assert_eq!(back.predict_proba(&[1.0, 0.0]), model.predict_proba(&[1.0, 0.0]));
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn kind_names_match_serde() {
        for kind in ModelKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
