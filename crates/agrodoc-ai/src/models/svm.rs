//! RBF-kernel support vector machine trained with simplified SMO, with
//! probability estimates from a Platt sigmoid fitted on the training
//! decision values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sigmoid;

const C: f64 = 1.0;
/// KKT violation tolerance.
const TOL: f64 = 1e-3;
/// Consecutive sweeps without an update before stopping.
const MAX_QUIET_PASSES: usize = 5;
const MAX_SWEEPS: usize = 200;
const ALPHA_EPS: f64 = 1e-8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Svm {
    support_vectors: Vec<Vec<f64>>,
    /// `alpha_i * y_i` per support vector.
    dual_coef: Vec<f64>,
    bias: f64,
    gamma: f64,
    platt: PlattScaling,
}

impl Svm {
    /// `gamma` follows the "scale" heuristic: `1 / (features · var(X))`.
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], seed: u64) -> Self {
        let gamma = scale_gamma(rows);
        let n = rows.len();
        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { -1.0 }).collect();

        let kernel: Vec<Vec<f64>> = rows
            .iter()
            .map(|a| rows.iter().map(|b| rbf(a, b, gamma)).collect())
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut alpha = vec![0.0; n];
        let mut bias = 0.0;
        // Σ_j alpha_j y_j K(i, j), without the bias.
        let mut output = vec![0.0; n];

        let mut quiet = 0;
        let mut sweeps = 0;
        while quiet < MAX_QUIET_PASSES && sweeps < MAX_SWEEPS && n > 1 {
            sweeps += 1;
            let mut changed = 0;

            for i in 0..n {
                let e_i = output[i] + bias - y[i];
                let violates = (y[i] * e_i < -TOL && alpha[i] < C)
                    || (y[i] * e_i > TOL && alpha[i] > 0.0);
                if !violates {
                    continue;
                }

                let mut j = rng.random_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let e_j = output[j] + bias - y[j];

                let (ai_old, aj_old) = (alpha[i], alpha[j]);
                let (lo, hi) = if y[i] != y[j] {
                    ((aj_old - ai_old).max(0.0), (C + aj_old - ai_old).min(C))
                } else {
                    ((ai_old + aj_old - C).max(0.0), (ai_old + aj_old).min(C))
                };
                if lo >= hi {
                    continue;
                }

                let eta = 2.0 * kernel[i][j] - kernel[i][i] - kernel[j][j];
                if eta >= 0.0 {
                    continue;
                }

                let aj = (aj_old - y[j] * (e_i - e_j) / eta).clamp(lo, hi);
                if (aj - aj_old).abs() < 1e-5 {
                    continue;
                }
                let ai = ai_old + y[i] * y[j] * (aj_old - aj);

                let di = y[i] * (ai - ai_old);
                let dj = y[j] * (aj - aj_old);
                let b1 = bias - e_i - di * kernel[i][i] - dj * kernel[i][j];
                let b2 = bias - e_j - di * kernel[i][j] - dj * kernel[j][j];
                bias = if ai > 0.0 && ai < C {
                    b1
                } else if aj > 0.0 && aj < C {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                alpha[i] = ai;
                alpha[j] = aj;
                for (k, out) in output.iter_mut().enumerate() {
                    *out += di * kernel[i][k] + dj * kernel[j][k];
                }
                changed += 1;
            }

            if changed == 0 {
                quiet += 1;
            } else {
                quiet = 0;
            }
        }

        let decisions: Vec<f64> = output.iter().map(|o| o + bias).collect();
        let platt = PlattScaling::fit(&decisions, labels);

        let mut support_vectors = Vec::new();
        let mut dual_coef = Vec::new();
        for (k, &a) in alpha.iter().enumerate() {
            if a > ALPHA_EPS {
                support_vectors.push(rows[k].clone());
                dual_coef.push(a * y[k]);
            }
        }

        debug!(
            support_vectors = support_vectors.len(),
            sweeps,
            gamma,
            platt_a = platt.a,
            platt_b = platt.b,
            "fitted svm"
        );

        Self {
            support_vectors,
            dual_coef,
            bias,
            gamma,
            platt,
        }
    }

    /// Signed distance-like score; positive means `valid`.
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, c)| c * rbf(sv, row, self.gamma))
            .sum::<f64>()
            + self.bias
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        self.platt.probability(self.decision_function(row))
    }
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * sq).exp()
}

fn scale_gamma(rows: &[Vec<f64>]) -> f64 {
    let dim = rows.first().map(|r| r.len()).unwrap_or(0);
    let count = (rows.len() * dim) as f64;
    if count == 0.0 {
        return 1.0;
    }
    let mean = rows.iter().flatten().sum::<f64>() / count;
    let var = rows.iter().flatten().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    if var > 0.0 { 1.0 / (dim as f64 * var) } else { 1.0 }
}

// ── Platt scaling ──

/// `P(valid | f) = 1 / (1 + exp(a·f + b))`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PlattScaling {
    a: f64,
    b: f64,
}

impl PlattScaling {
    /// Newton's method with backtracking on the regularized targets of
    /// Lin, Lin and Weng (2007).
    fn fit(decisions: &[f64], labels: &[bool]) -> Self {
        const MAX_ITER: usize = 100;
        const MIN_STEP: f64 = 1e-10;
        const SIGMA: f64 = 1e-12;
        const EPS: f64 = 1e-5;

        let prior1 = labels.iter().filter(|&&l| l).count() as f64;
        let prior0 = labels.len() as f64 - prior1;
        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&l| if l { hi_target } else { lo_target })
            .collect();

        let objective = |a: f64, b: f64| -> f64 {
            decisions
                .iter()
                .zip(&targets)
                .map(|(&f, &t)| {
                    let z = f * a + b;
                    if z >= 0.0 {
                        t * z + (-z).exp().ln_1p()
                    } else {
                        (t - 1.0) * z + z.exp().ln_1p()
                    }
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(a, b);

        for _ in 0..MAX_ITER {
            let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
            let (mut g1, mut g2) = (0.0, 0.0);
            for (&f, &t) in decisions.iter().zip(&targets) {
                // p = P(valid), q = 1 - p
                let p = sigmoid(-(f * a + b));
                let q = 1.0 - p;
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = t - p;
                g1 += f * d1;
                g2 += d1;
            }
            if g1.abs() < EPS && g2.abs() < EPS {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= MIN_STEP {
                let (na, nb) = (a + step * da, b + step * db);
                let nf = objective(na, nb);
                if nf < fval + 1e-4 * step * gd {
                    a = na;
                    b = nb;
                    fval = nf;
                    break;
                }
                step /= 2.0;
            }
            if step < MIN_STEP {
                break;
            }
        }

        Self { a, b }
    }

    fn probability(&self, decision: f64) -> f64 {
        sigmoid(-(self.a * decision + self.b))
    }
}
