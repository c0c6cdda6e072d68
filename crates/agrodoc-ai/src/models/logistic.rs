//! L2-regularized logistic regression fitted by full-batch gradient descent.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sigmoid;

/// Inverse regularization strength.
const C: f64 = 1.0;
const MAX_ITER: usize = 1000;
/// Stop once the gradient norm falls below this.
const TOL: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticRegression {
    /// Minimizes `mean(logloss) + ||w||² / (2·C·n)`. The intercept is not
    /// penalized.
    pub fn fit(rows: &[Vec<f64>], labels: &[bool]) -> Self {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f64;
        let l2 = 1.0 / (C * n);

        // Step size from a Lipschitz bound on the gradient: 0.25·λmax(XᵀX/n)
        // is at most 0.25·mean(||x||² + 1) for the intercept-augmented rows.
        let mean_sq_norm =
            rows.iter().map(|r| r.iter().map(|v| v * v).sum::<f64>() + 1.0).sum::<f64>() / n;
        let step = 1.0 / (0.25 * mean_sq_norm + l2);

        let mut weights = vec![0.0; dim];
        let mut intercept = 0.0;
        let mut iterations = 0;

        for iter in 0..MAX_ITER {
            iterations = iter + 1;
            let mut grad = vec![0.0; dim];
            let mut grad_b = 0.0;

            for (row, &label) in rows.iter().zip(labels) {
                let z = dot(&weights, row) + intercept;
                let err = sigmoid(z) - if label { 1.0 } else { 0.0 };
                for (g, &x) in grad.iter_mut().zip(row) {
                    *g += err * x;
                }
                grad_b += err;
            }

            let mut norm = 0.0;
            for (g, &w) in grad.iter_mut().zip(&weights) {
                *g = *g / n + l2 * w;
                norm += *g * *g;
            }
            grad_b /= n;
            norm += grad_b * grad_b;

            if norm.sqrt() < TOL {
                break;
            }
            for (w, g) in weights.iter_mut().zip(&grad) {
                *w -= step * g;
            }
            intercept -= step * grad_b;
        }

        debug!(iterations, intercept, "fitted logistic regression");
        Self { weights, intercept }
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(dot(&self.weights, row) + self.intercept)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
